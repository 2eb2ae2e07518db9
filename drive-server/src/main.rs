//! DriveSim Server
//!
//! Headless simulation host with HUD page and REST API

use anyhow::Result;
use drive_core::TelemetrySource;
use drive_server::{api, manager, state};
use drive_sim::{DriveSession, SimConfig};
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting DriveSim Server");

    let config = SimConfig::load()?;
    let mut session = DriveSession::new(config);
    if let Err(e) = session.start() {
        warn!("Session not started: {}", e);
    }

    // Create application state
    let state = state::AppState::new(Box::new(session));

    // Build the router
    let app = api::create_router(state.clone());

    // Start frame driver in background
    let cancel = CancellationToken::new();
    let driver = tokio::spawn(manager::run(state.clone(), cancel.clone()));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 9100));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    driver.await?;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
    cancel.cancel();
}
