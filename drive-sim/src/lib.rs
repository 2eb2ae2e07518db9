//! DriveSim simulation core
//!
//! Arcade vehicle dynamics, a smoothed tracking camera and the per-tick
//! loop that ties them to the driver's input. [`DriveSession`] wraps the
//! loop as a [`drive_core::TelemetrySource`] for hosts.

pub mod camera;
pub mod config;
pub mod dynamics;
pub mod input;
pub mod session;
pub mod sim_loop;
pub mod vehicle;

pub use camera::{CameraRig, CameraState, CAMERA_SMOOTHING};
pub use config::{CameraSettings, SimConfig, CONFIG_ENV_VAR};
pub use dynamics::{
    NoNoise, NoiseSource, RngNoise, VehicleDynamicsModel, VehicleState, VehicleTuning, MAX_GEAR,
};
pub use input::{InputSampler, InputState, KeyBindings, RawControls};
pub use session::DriveSession;
pub use sim_loop::{FixedTimestep, SimulationLoop, TickOutput, VehiclePose};
pub use vehicle::{AssetLoader, FallbackLoader, JsonModelLoader, VehicleModel, WheelDescriptor};
