//! Per-tick orchestration
//!
//! Within a tick: input sampling, then dynamics, then camera, then the
//! output handed to the renderer and HUD. Camera and telemetry always read
//! the dynamics result of the same tick.
//!
//! [`SimulationLoop::tick`] runs exactly one logical tick. Hosts with a
//! variable frame rate call [`SimulationLoop::advance`] instead, which
//! feeds a fixed-timestep accumulator and runs as many ticks as are due.

use crate::camera::CameraRig;
use crate::config::SimConfig;
use crate::dynamics::{NoiseSource, VehicleDynamicsModel, VehicleState};
use crate::input::{InputSampler, InputState, RawControls};
use crate::vehicle::VehicleModel;
use drive_core::{CameraMode, CameraPose, ControlEvent, TelemetrySnapshot, WheelPose};
use glam::Vec3;
use std::f32::consts::{PI, TAU};
use std::time::Duration;
use tracing::{debug, info};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Integer-nanosecond accumulator producing fixed ticks
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step_nanos: u64,
    accumulated: u64,
    max_catch_up: u32,
}

impl FixedTimestep {
    pub fn new(tick_rate_hz: u32, max_catch_up: u32) -> Self {
        let rate = u64::from(tick_rate_hz.max(1));
        Self {
            step_nanos: (NANOS_PER_SECOND / rate).max(1),
            accumulated: 0,
            max_catch_up: max_catch_up.max(1),
        }
    }

    /// Add elapsed wall time and return how many ticks are due
    ///
    /// A backlog larger than the catch-up limit is dropped rather than
    /// replayed.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        let elapsed = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.accumulated = self.accumulated.saturating_add(elapsed);

        let due = self.accumulated / self.step_nanos;
        self.accumulated -= due * self.step_nanos;

        let run = due.min(u64::from(self.max_catch_up));
        if due > run {
            debug!(dropped = due - run, "simulation fell behind, dropping ticks");
        }
        run as u32
    }

    /// Progress through the current tick, in [0, 1)
    pub fn alpha(&self) -> f32 {
        self.accumulated as f32 / self.step_nanos as f32
    }
}

/// Vehicle placement handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehiclePose {
    pub position: Vec3,
    pub heading: f32,
}

impl VehiclePose {
    fn of(state: &VehicleState) -> Self {
        Self {
            position: state.position,
            heading: state.heading,
        }
    }

    /// Blend toward `to`, turning the short way round
    pub fn lerp(&self, to: &VehiclePose, t: f32) -> Self {
        let mut delta = to.heading - self.heading;
        if delta > PI {
            delta -= TAU;
        } else if delta < -PI {
            delta += TAU;
        }
        Self {
            position: self.position.lerp(to.position, t),
            heading: self.heading + delta * t,
        }
    }
}

/// Everything one tick produced
#[derive(Debug, Clone)]
pub struct TickOutput {
    /// Logical tick number, starting at 1
    pub tick: u64,
    pub input: InputState,
    pub vehicle: VehicleState,
    pub telemetry: TelemetrySnapshot,
    pub camera: CameraPose,
    pub wheels: Vec<WheelPose>,
}

/// Owns the input state, the dynamics model and the camera rig
pub struct SimulationLoop {
    raw: RawControls,
    sampler: InputSampler,
    dynamics: VehicleDynamicsModel,
    camera: CameraRig,
    model: VehicleModel,
    timestep: FixedTimestep,
    previous: VehiclePose,
    tick_count: u64,
}

impl SimulationLoop {
    pub fn new(config: &SimConfig, model: VehicleModel, noise: Box<dyn NoiseSource>) -> Self {
        let dynamics = VehicleDynamicsModel::new(config.tuning.clone(), noise);
        let mut camera = CameraRig::new(config.camera.initial_mode, config.camera.smoothing);
        camera.snap_to(dynamics.state());
        let previous = VehiclePose::of(dynamics.state());

        Self {
            raw: RawControls::new(&config.bindings),
            sampler: InputSampler::new(&config.bindings),
            dynamics,
            camera,
            model,
            timestep: FixedTimestep::new(config.tick_rate_hz, config.max_catch_up_ticks),
            previous,
            tick_count: 0,
        }
    }

    /// Fold a raw key transition into the held-input state
    pub fn submit(&mut self, event: &ControlEvent) {
        self.raw.apply(event);
    }

    /// Forget every held key
    pub fn release_inputs(&mut self) {
        self.raw.release_all();
    }

    /// Run exactly one logical tick
    pub fn tick(&mut self) -> TickOutput {
        let input = self.sampler.update(&self.raw);
        self.raw.end_tick();

        self.previous = VehiclePose::of(self.dynamics.state());
        let (vehicle, telemetry) = self.dynamics.step(&input);

        if input.cycle_camera_requested {
            let mode = self.camera.cycle_mode();
            info!("Camera mode: {}", mode);
        }
        let camera = self.camera.step(&vehicle);

        self.tick_count += 1;
        TickOutput {
            tick: self.tick_count,
            input,
            vehicle,
            telemetry,
            camera,
            wheels: self.model.wheel_poses(&vehicle),
        }
    }

    /// Run every fixed tick that `elapsed` makes due and return the last
    /// one's output, or `None` when no tick was due
    pub fn advance(&mut self, elapsed: Duration) -> Option<TickOutput> {
        let due = self.timestep.accumulate(elapsed);
        let mut last = None;
        for _ in 0..due {
            last = Some(self.tick());
        }
        last
    }

    /// Vehicle pose between the last two ticks, for rendering between them
    pub fn interpolated_pose(&self) -> VehiclePose {
        let current = VehiclePose::of(self.dynamics.state());
        self.previous.lerp(&current, self.timestep.alpha())
    }

    pub fn vehicle(&self) -> &VehicleState {
        self.dynamics.state()
    }

    pub fn vehicle_model(&self) -> &VehicleModel {
        &self.model
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera.mode()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
