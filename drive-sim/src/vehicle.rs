//! Vehicle descriptors and asset loading
//!
//! Wheels are attached to the vehicle by explicit slot when the model is
//! built, so the renderer never has to guess which mesh is a front or a
//! left wheel.

use crate::dynamics::VehicleState;
use drive_core::units::Radians;
use drive_core::{SimError, WheelPose, WheelPosition};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One wheel, in the vehicle's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelDescriptor {
    pub position: WheelPosition,
    /// Hub offset from the body origin (meters, +X left, +Z forward)
    pub offset: [f32; 3],
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub name: String,
    pub wheels: Vec<WheelDescriptor>,
}

impl VehicleModel {
    /// Minimal built-in vehicle, always available
    pub fn fallback() -> Self {
        let wheels = WheelPosition::ALL
            .into_iter()
            .map(|position| {
                let x = if position.is_left() { 1.9 } else { -1.9 };
                let z = if position.is_front() { 3.0 } else { -3.0 };
                WheelDescriptor {
                    position,
                    offset: [x, 0.7, z],
                    radius: 0.7,
                }
            })
            .collect();

        Self {
            name: "fallback".to_string(),
            wheels,
        }
    }

    /// Exactly one wheel per slot, with sane dimensions
    pub fn validate(&self) -> Result<(), String> {
        if self.wheels.len() != WheelPosition::ALL.len() {
            return Err(format!("expected 4 wheels, found {}", self.wheels.len()));
        }
        for slot in WheelPosition::ALL {
            let count = self.wheels.iter().filter(|w| w.position == slot).count();
            if count != 1 {
                return Err(format!("expected one {:?} wheel, found {}", slot, count));
            }
        }
        for wheel in &self.wheels {
            if !(wheel.radius.is_finite() && wheel.radius > 0.0) {
                return Err(format!("{:?} wheel has invalid radius {}", wheel.position, wheel.radius));
            }
            if wheel.offset.iter().any(|c| !c.is_finite()) {
                return Err(format!("{:?} wheel has a non-finite offset", wheel.position));
            }
        }
        Ok(())
    }

    pub fn wheel(&self, position: WheelPosition) -> Option<&WheelDescriptor> {
        self.wheels.iter().find(|w| w.position == position)
    }

    /// Render pose of every wheel for the given vehicle state
    pub fn wheel_poses(&self, state: &VehicleState) -> Vec<WheelPose> {
        self.wheels
            .iter()
            .map(|wheel| WheelPose {
                wheel: wheel.position,
                spin: Radians(state.wheel_spin),
                steer: Radians(if wheel.position.is_front() {
                    state.front_wheel_yaw
                } else {
                    0.0
                }),
            })
            .collect()
    }
}

/// Source of the vehicle representation used by a session
pub trait AssetLoader: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    fn load_vehicle(&self) -> Result<VehicleModel, SimError>;
}

/// Always yields [`VehicleModel::fallback`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackLoader;

impl AssetLoader for FallbackLoader {
    fn describe(&self) -> String {
        "built-in vehicle".to_string()
    }

    fn load_vehicle(&self) -> Result<VehicleModel, SimError> {
        Ok(VehicleModel::fallback())
    }
}

/// Reads a JSON vehicle descriptor from disk
#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    path: PathBuf,
}

impl JsonModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, reason: impl Into<String>) -> SimError {
        SimError::AssetLoad {
            asset: self.path.display().to_string(),
            reason: reason.into(),
        }
    }
}

impl AssetLoader for JsonModelLoader {
    fn describe(&self) -> String {
        format!("vehicle descriptor {}", self.path.display())
    }

    fn load_vehicle(&self) -> Result<VehicleModel, SimError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| self.error(e.to_string()))?;
        let model: VehicleModel =
            serde_json::from_str(&text).map_err(|e| self.error(e.to_string()))?;
        model.validate().map_err(|reason| self.error(reason))?;
        Ok(model)
    }
}
