//! Integration tests for the drive-server HTTP API
//!
//! Uses tower::ServiceExt::oneshot to test routes directly without binding a port.

use axum::body::Body;
use drive_core::{SessionStatus, TelemetrySource};
use drive_server::{api::create_router, manager, state::AppState};
use drive_sim::{DriveSession, SimConfig};
use http_body_util::BodyExt;
use hyper::Request;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

fn quiet_config() -> SimConfig {
    SimConfig {
        rpm_jitter: false,
        ..SimConfig::default()
    }
}

/// Helper: router over an idle session, with the state for further manipulation
fn app_with_state() -> (axum::Router, AppState) {
    let state = AppState::new(Box::new(DriveSession::new(quiet_config())));
    let router = create_router(state.clone());
    (router, state)
}

/// Helper: router over a session that is already running
fn running_app() -> (axum::Router, AppState) {
    let mut session = DriveSession::new(quiet_config());
    session.start().unwrap();
    let state = AppState::new(Box::new(session));
    let router = create_router(state.clone());
    (router, state)
}

/// Helper: collect response body into string
async fn body_string(body: Body) -> String {
    let collected = body.collect().await.unwrap();
    String::from_utf8(collected.to_bytes().to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, json: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    match json {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// ==================== GET / ====================

#[tokio::test]
async fn test_get_root_returns_200_with_html() {
    let (app, _) = app_with_state();

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        content_type.contains("text/html"),
        "Expected text/html content-type, got: {}",
        content_type
    );

    let body = body_string(response.into_body()).await;
    assert!(body.contains("<!DOCTYPE html>"));
    assert!(body.contains("/api/input"));
}

// ==================== /api/session ====================

#[tokio::test]
async fn test_get_session_reports_idle() {
    let (app, _) = app_with_state();

    let response = app.oneshot(get("/api/session")).await.unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value =
        serde_json::from_str(&body_string(response.into_body()).await).unwrap();
    assert_eq!(json["key"], "drive");
    assert_eq!(json["name"], "DriveSim");
    assert_eq!(json["status"]["state"], "idle");
}

#[tokio::test]
async fn test_start_then_stop_session() {
    let (app, state) = app_with_state();

    let response = app
        .clone()
        .oneshot(post("/api/session/start", None))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let json: serde_json::Value =
        serde_json::from_str(&body_string(response.into_body()).await).unwrap();
    assert_eq!(json["state"], "running");
    assert!(state.source.read().await.is_active());

    let response = app.oneshot(post("/api/session/stop", None)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(state.source.read().await.status(), SessionStatus::Stopped);
}

#[tokio::test]
async fn test_start_with_missing_asset_returns_500() {
    let config = SimConfig {
        vehicle_model: Some("/nonexistent/drive-sim/car.json".into()),
        ..quiet_config()
    };
    let state = AppState::new(Box::new(DriveSession::new(config)));
    let app = create_router(state.clone());

    let response = app.oneshot(post("/api/session/start", None)).await.unwrap();
    assert_eq!(response.status(), 500);
    assert!(matches!(
        state.source.read().await.status(),
        SessionStatus::Failed { .. }
    ));
}

// ==================== POST /api/input ====================

#[tokio::test]
async fn test_input_when_idle_returns_409() {
    let (app, _) = app_with_state();

    let response = app
        .oneshot(post("/api/input", Some(r#"{"key":"w","pressed":true}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_input_when_running_returns_202() {
    let (app, state) = running_app();

    let response = app
        .oneshot(post("/api/input", Some(r#"{"key":"ArrowUp","pressed":true}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    manager::frame_cycle(&state, Duration::from_millis(17))
        .await
        .unwrap();
    let latest = state.latest.read().await;
    assert!(latest.as_ref().unwrap().throttle);
}

#[tokio::test]
async fn test_shifted_press_is_released_by_lowercase_key() {
    let (app, state) = running_app();

    let response = app
        .clone()
        .oneshot(post("/api/input", Some(r#"{"key":"W","pressed":true}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    manager::frame_cycle(&state, Duration::from_millis(17))
        .await
        .unwrap();
    assert!(state.latest.read().await.as_ref().unwrap().throttle);

    let response = app
        .clone()
        .oneshot(post("/api/input", Some(r#"{"key":"w","pressed":false}"#)))
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    manager::frame_cycle(&state, Duration::from_millis(17))
        .await
        .unwrap();
    assert!(!state.latest.read().await.as_ref().unwrap().throttle);

    // The page must send the same lower-cased key on press and release
    let page = body_string(app.oneshot(get("/")).await.unwrap().into_body()).await;
    assert!(page.contains("toLowerCase()"));
    assert!(page.contains("extras.rpm_fraction"));
}

#[tokio::test]
async fn test_malformed_input_is_rejected() {
    let (app, _) = running_app();

    let response = app
        .oneshot(post("/api/input", Some(r#"{"button":"w"}"#)))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

// ==================== GET /api/telemetry ====================

#[tokio::test]
async fn test_latest_telemetry_404_before_first_frame() {
    let (app, _) = running_app();
    let response = app.oneshot(get("/api/telemetry")).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_latest_telemetry_after_frame() {
    let (app, state) = running_app();
    manager::frame_cycle(&state, Duration::from_millis(17))
        .await
        .unwrap();

    let response = app.oneshot(get("/api/telemetry")).await.unwrap();
    assert_eq!(response.status(), 200);

    let json: serde_json::Value =
        serde_json::from_str(&body_string(response.into_body()).await).unwrap();
    assert_eq!(json["source"], "DriveSim");
    assert_eq!(json["tick"], 1);
    assert_eq!(json["gear"], 1);
    assert_eq!(json["camera"]["mode"], "chase");
}

// ==================== GET /api/telemetry/stream ====================

#[tokio::test]
async fn test_telemetry_stream_returns_sse_content_type() {
    let (app, _) = running_app();

    let response = app.oneshot(get("/api/telemetry/stream")).await.unwrap();
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(
        content_type.contains("text/event-stream"),
        "SSE endpoint should return text/event-stream, got: {}",
        content_type
    );
}

#[tokio::test]
async fn test_telemetry_stream_with_field_filter() {
    let (app, state) = running_app();

    // Publish shortly after the stream subscribes
    let publisher = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        manager::frame_cycle(&publisher, Duration::from_millis(17))
            .await
            .unwrap();
    });

    let response = app
        .oneshot(get("/api/telemetry/stream?fields=speed_kmh,gear"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.into_body();
    let result = tokio::time::timeout(Duration::from_secs(3), async {
        let mut stream = body.into_data_stream();
        use futures::StreamExt;
        if let Some(Ok(chunk)) = stream.next().await {
            return Some(String::from_utf8(chunk.to_vec()).unwrap());
        }
        None
    })
    .await;

    if let Ok(Some(text)) = result {
        assert!(text.contains("data:"), "expected SSE data, got: {}", text);
        assert!(text.contains("speed_kmh"));
        assert!(text.contains("\"tick\""));
        assert!(!text.contains("wheels"), "unrequested field leaked: {}", text);
    }
}

// ==================== Frame driver ====================

#[tokio::test]
async fn test_frame_cycle_skips_inactive_session() {
    let (_, state) = app_with_state();
    manager::frame_cycle(&state, Duration::from_millis(17))
        .await
        .unwrap();
    assert!(state.latest.read().await.is_none());
}

#[tokio::test]
async fn test_frame_driver_publishes_and_stops_on_cancel() {
    let (_, state) = running_app();
    let mut rx = state.subscribe();
    let cancel = CancellationToken::new();
    let driver = tokio::spawn(manager::run(state.clone(), cancel.clone()));

    let frame = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("frame driver should publish within 3 s")
        .unwrap();
    assert_eq!(frame.source, "DriveSim");

    cancel.cancel();
    driver.await.unwrap();
    assert_eq!(state.source.read().await.status(), SessionStatus::Stopped);
}
