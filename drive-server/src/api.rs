//! REST API and SSE routes

use crate::state::AppState;
use crate::web_ui;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use drive_core::{ControlEvent, FieldMask, SessionStatus, SimError, TelemetryFrame};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(web_ui::serve_ui))
        .route("/api/session", get(session_info))
        .route("/api/session/start", post(start_session))
        .route("/api/session/stop", post(stop_session))
        .route("/api/input", post(submit_input))
        .route("/api/telemetry", get(latest_frame))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Session Endpoints ===

#[derive(Serialize)]
struct SessionInfo {
    key: String,
    name: String,
    status: SessionStatus,
}

async fn session_info(State(state): State<AppState>) -> Json<SessionInfo> {
    let source = state.source.read().await;
    Json(SessionInfo {
        key: source.key().to_string(),
        name: source.name().to_string(),
        status: source.status(),
    })
}

async fn start_session(
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, (StatusCode, String)> {
    let mut source = state.source.write().await;
    source
        .start()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to start: {}", e)))?;
    Ok(Json(source.status()))
}

async fn stop_session(
    State(state): State<AppState>,
) -> Result<Json<SessionStatus>, (StatusCode, String)> {
    let mut source = state.source.write().await;
    source
        .stop()
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to stop: {}", e)))?;
    Ok(Json(source.status()))
}

// === Input Endpoint ===

async fn submit_input(
    State(state): State<AppState>,
    Json(event): Json<ControlEvent>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut source = state.source.write().await;
    match source.submit(event) {
        Ok(()) => Ok(StatusCode::ACCEPTED),
        Err(e) if matches!(e.downcast_ref::<SimError>(), Some(SimError::NotRunning)) => {
            Err((StatusCode::CONFLICT, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

// === Telemetry Endpoints ===

async fn latest_frame(
    State(state): State<AppState>,
) -> Result<Json<TelemetryFrame>, (StatusCode, String)> {
    let latest = state.latest.read().await;
    match &*latest {
        Some(frame) => Ok(Json(frame.clone())),
        None => Err((StatusCode::NOT_FOUND, "No telemetry yet".to_string())),
    }
}

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> impl IntoResponse {
    Sse::new(frame_events(&state, query.fields)).keep_alive(KeepAlive::default())
}

fn frame_events(
    state: &AppState,
    fields: Option<String>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let rx = state.subscribe();
    let field_mask = fields.map(|f| FieldMask::parse(&f));

    BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(frame) => {
                    // Serialize with field mask
                    match frame.to_json_filtered(mask.as_ref()) {
                        Ok(json) => Some(Ok(Event::default().data(json))),
                        Err(e) => {
                            tracing::error!("Failed to serialize frame: {}", e);
                            None
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    })
}
