//! Telemetry source trait definition

use crate::model::{ControlEvent, SessionStatus, TelemetryFrame};
use anyhow::Result;
use std::time::Duration;

/// A frame-driven producer of telemetry that a host can drive
///
/// Each source is responsible for:
/// - Acquiring its resources on start (a failure leaves it in `Failed`)
/// - Accepting raw control events while running
/// - Advancing itself by real elapsed time and publishing frames
pub trait TelemetrySource: Send + Sync {
    /// Short machine-friendly identifier (e.g., "drive")
    fn key(&self) -> &str;

    /// Display name of this source
    fn name(&self) -> &str;

    /// Start producing frames
    ///
    /// Called by the host before the first frame. Load assets and build
    /// simulation state here.
    fn start(&mut self) -> Result<()>;

    /// Stop producing frames
    ///
    /// Only called between frames. Release input subscriptions and any
    /// per-run state.
    fn stop(&mut self) -> Result<()>;

    /// Forward a raw control event from the input collaborator
    fn submit(&mut self, event: ControlEvent) -> Result<()>;

    /// Advance by `elapsed` wall-clock time and return the newest frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if at least one tick ran
    /// - `Ok(None)` if no tick was due or the source is inactive
    /// - `Err(_)` if an error occurred
    fn read_frame(&mut self, elapsed: Duration) -> Result<Option<TelemetryFrame>>;

    /// Current lifecycle state
    fn status(&self) -> SessionStatus;

    /// Get whether the source is currently producing frames
    fn is_active(&self) -> bool {
        self.status() == SessionStatus::Running
    }
}
