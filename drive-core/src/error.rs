//! Error taxonomy for simulation setup and lifecycle
//!
//! The per-tick numeric core never fails; these errors only arise while
//! loading configuration and assets or when driving a source that is not
//! running.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// A visual asset could not be loaded. Surfaces as an initialization
    /// failure and halts simulation start.
    #[error("failed to load asset {asset}: {reason}")]
    AssetLoad { asset: String, reason: String },

    #[error("invalid vehicle tuning: {0}")]
    InvalidTuning(String),

    #[error("failed to read config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("simulation is not running")]
    NotRunning,
}
