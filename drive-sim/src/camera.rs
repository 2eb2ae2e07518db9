//! Camera tracking
//!
//! The rig keeps one live camera pose and, each tick, pulls it toward the
//! preset pose for the current mode. Presets are expressed in the vehicle's
//! local frame and rotated into world space by the vehicle heading.
//!
//! The smoothing factor is a per-tick blend tied to the fixed 60 Hz tick.
//! It is not frame-rate independent; running the rig at another rate would
//! need the exponential form `1 - exp(-k * dt)`.

use crate::dynamics::{world_meters, VehicleState};
use drive_core::{CameraMode, CameraPose};
use glam::Vec3;

/// Default per-tick blend toward the desired pose
pub const CAMERA_SMOOTHING: f32 = 0.1;

/// Distance ahead of the camera used as its current aim point
const AIM_DISTANCE: f32 = 10.0;

/// Camera offset and look-at offset in the vehicle's local frame
pub fn preset(mode: CameraMode) -> (Vec3, Vec3) {
    match mode {
        CameraMode::Chase => (Vec3::new(0.0, 8.0, -20.0), Vec3::new(0.0, 2.0, 15.0)),
        CameraMode::Hood => (Vec3::new(0.0, 3.0, 5.0), Vec3::new(0.0, 3.0, 30.0)),
        CameraMode::Cockpit => (Vec3::new(0.0, 3.5, 1.0), Vec3::new(0.0, 3.5, 20.0)),
        CameraMode::Side => (Vec3::new(15.0, 5.0, 0.0), Vec3::new(0.0, 2.0, 5.0)),
        CameraMode::Top => (Vec3::new(0.0, 30.0, -5.0), Vec3::new(0.0, 0.0, 10.0)),
    }
}

/// Live camera state owned by the rig
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub mode: CameraMode,
    pub position: Vec3,
    pub look_at: Vec3,
}

impl CameraState {
    /// Unit direction the camera currently faces
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            mode: self.mode,
            position: world_meters(self.position),
            look_at: world_meters(self.look_at),
        }
    }
}

pub struct CameraRig {
    state: CameraState,
    smoothing: f32,
}

impl CameraRig {
    /// A rig at the origin facing -Z. Call [`CameraRig::snap_to`] before
    /// the first tick to avoid a long swoop in from the origin.
    pub fn new(mode: CameraMode, smoothing: f32) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(f32::EPSILON, 1.0)
        } else {
            CAMERA_SMOOTHING
        };
        Self {
            state: CameraState {
                mode,
                position: Vec3::ZERO,
                look_at: Vec3::NEG_Z * AIM_DISTANCE,
            },
            smoothing,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.state.mode
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Switch to the next preset; the pose keeps interpolating from where
    /// it is
    pub fn cycle_mode(&mut self) -> CameraMode {
        self.state.mode = self.state.mode.next();
        self.state.mode
    }

    /// World-space desired position and look-at point for the current mode
    pub fn desired(&self, vehicle: &VehicleState) -> (Vec3, Vec3) {
        let (offset, look) = preset(self.state.mode);
        let rotation = vehicle.rotation();
        (
            vehicle.position + rotation * offset,
            vehicle.position + rotation * look,
        )
    }

    /// Jump straight to the desired pose
    pub fn snap_to(&mut self, vehicle: &VehicleState) {
        let (position, look_at) = self.desired(vehicle);
        self.state.position = position;
        self.state.look_at = look_at;
    }

    /// Advance one tick toward the desired pose for `vehicle`
    pub fn step(&mut self, vehicle: &VehicleState) -> CameraPose {
        let (desired_position, desired_look_at) = self.desired(vehicle);
        let facing = self.state.forward();

        self.state.position = self.state.position.lerp(desired_position, self.smoothing);
        let aim = self.state.position + facing * AIM_DISTANCE;
        self.state.look_at = aim.lerp(desired_look_at, self.smoothing);

        self.state.pose()
    }
}
