//! DriveSim Core Library
//!
//! This crate provides the data model that the driving simulation publishes
//! to its renderer and HUD collaborators, the error taxonomy, and the
//! telemetry source trait that hosts drive.

pub mod adapter;
pub mod error;
pub mod model;
pub mod units;

pub use adapter::TelemetrySource;
pub use error::SimError;
pub use model::{
    CameraMode, CameraPose, ControlEvent, FieldMask, SessionStatus, TelemetryFrame,
    TelemetrySnapshot, WheelPose, WheelPosition,
};
