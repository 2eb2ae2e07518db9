//! Frame driver
//!
//! This module handles:
//! - Advancing the active session by real elapsed time, once per frame
//! - Broadcasting frames to subscribers
//! - Stopping the session between frames on shutdown

use crate::state::AppState;
use anyhow::Result;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const FRAME_INTERVAL: Duration = Duration::from_millis(16); // ~60Hz

/// Main frame loop, runs until `cancel` fires
pub async fn run(state: AppState, cancel: CancellationToken) {
    info!("Frame driver started");

    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let now = Instant::now();
        let elapsed = now - last;
        last = now;

        if let Err(e) = frame_cycle(&state, elapsed).await {
            warn!("Error reading frame: {}", e);
        }
    }

    let mut source = state.source.write().await;
    if let Err(e) = source.stop() {
        error!("Error stopping {}: {}", source.name(), e);
    }
    info!("Frame driver stopped");
}

/// Advance the source by `elapsed` and publish the resulting frame
pub async fn frame_cycle(state: &AppState, elapsed: Duration) -> Result<()> {
    let frame = {
        let mut source = state.source.write().await;
        if !source.is_active() {
            return Ok(());
        }
        source.read_frame(elapsed)?
    };

    if let Some(frame) = frame {
        state.publish(frame).await;
    }

    Ok(())
}
