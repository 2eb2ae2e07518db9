//! Application state management

use drive_core::{TelemetryFrame, TelemetrySource};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The simulation being driven
    pub source: Arc<RwLock<Box<dyn TelemetrySource>>>,

    /// Broadcast channel for telemetry frames
    /// Multiple consumers can subscribe to receive frames
    pub telemetry_tx: broadcast::Sender<TelemetryFrame>,

    /// Most recently published frame
    pub latest: Arc<RwLock<Option<TelemetryFrame>>>,
}

impl AppState {
    pub fn new(source: Box<dyn TelemetrySource>) -> Self {
        // Create broadcast channel with capacity for 100 frames
        let (telemetry_tx, _) = broadcast::channel(100);

        Self {
            source: Arc::new(RwLock::new(source)),
            telemetry_tx,
            latest: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribe to telemetry frames
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryFrame> {
        self.telemetry_tx.subscribe()
    }

    /// Store a frame as the latest and broadcast it
    pub async fn publish(&self, frame: TelemetryFrame) {
        *self.latest.write().await = Some(frame.clone());
        // Ignore error if no receivers (they'll get the next frame)
        let _ = self.telemetry_tx.send(frame);
    }
}
