//! Arcade vehicle dynamics
//!
//! One call to [`VehicleDynamicsModel::step`] advances the vehicle by one
//! fixed tick. All constants in [`VehicleTuning`] are per-tick quantities
//! tuned for a 60 Hz tick; changing the tick rate changes the feel unless
//! they are re-derived.
//!
//! Per tick, in order: acceleration selection, RPM, velocity integration
//! with multiplicative damping, display speed, automatic transmission,
//! steering, heading and lean, position, wheel spin, road containment.

use crate::input::InputState;
use drive_core::model::{TelemetrySnapshot, Vector3};
use drive_core::units::{KilometersPerHour, Meters, Rpm};
use drive_core::SimError;
use glam::{Quat, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use tracing::debug;

/// Highest gear of the automatic transmission
pub const MAX_GEAR: u8 = 5;

/// Below this longitudinal speed the vehicle reads as stationary
pub const REST_EPSILON: f32 = 1e-4;

/// Wheel spin is folded back into one turn once it grows past this
const WHEEL_SPIN_WRAP: f32 = 1024.0 * TAU;

/// Tunable constants of the dynamics model, all per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    /// Base velocity increment per tick while accelerating
    pub engine_power: f32,
    /// Extra engine power fraction per gear
    pub gear_power_step: f32,
    pub brake_power: f32,
    /// Rolling drag applied with no pedal held
    pub idle_decel: f32,
    pub friction: f32,
    pub air_resistance: f32,
    /// Internal velocity units to km/h
    pub kmh_per_unit: f32,
    /// Upshift thresholds in km/h, indexed by gear
    pub gear_thresholds: [f32; 6],
    pub downshift_hysteresis: f32,
    pub idle_rpm: f32,
    pub redline_rpm: f32,
    pub rpm_base: f32,
    pub rpm_per_kmh: f32,
    /// Amplitude of the cosmetic RPM jitter
    pub rpm_jitter: f32,
    pub rpm_brake_drop: f32,
    pub rpm_coast_drop: f32,
    pub steering_speed: f32,
    pub max_steering: f32,
    /// Self-centering factor per tick with no steering held
    pub steering_return: f32,
    pub drift_steer_factor: f32,
    pub drift_yaw_factor: f32,
    pub yaw_gain: f32,
    /// Below this speed the vehicle does not rotate
    pub yaw_dead_zone: f32,
    pub lean_gain: f32,
    pub lean_full_speed_kmh: f32,
    pub wheel_spin_gain: f32,
    pub front_toe_gain: f32,
    pub road_half_width: f32,
    /// Velocity scale applied when the road edge is hit
    pub edge_bleed: f32,
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            engine_power: 0.2,
            gear_power_step: 0.1,
            brake_power: 0.4,
            idle_decel: 0.02,
            friction: 0.96,
            air_resistance: 0.998,
            kmh_per_unit: 12.0,
            gear_thresholds: [0.0, 30.0, 65.0, 110.0, 160.0, 220.0],
            downshift_hysteresis: 10.0,
            idle_rpm: 800.0,
            redline_rpm: 7500.0,
            rpm_base: 1500.0,
            rpm_per_kmh: 40.0,
            rpm_jitter: 100.0,
            rpm_brake_drop: 80.0,
            rpm_coast_drop: 30.0,
            steering_speed: 0.04,
            max_steering: 0.6,
            steering_return: 0.85,
            drift_steer_factor: 1.5,
            drift_yaw_factor: 1.3,
            yaw_gain: 0.4,
            yaw_dead_zone: 0.02,
            lean_gain: 0.05,
            lean_full_speed_kmh: 100.0,
            wheel_spin_gain: 2.0,
            front_toe_gain: 0.6,
            road_half_width: 7.0,
            edge_bleed: 0.7,
        }
    }
}

impl VehicleTuning {
    /// Reject constants that would break the clamp invariants or let the
    /// damping diverge
    pub fn validate(&self) -> Result<(), SimError> {
        let scalars = [
            ("engine_power", self.engine_power),
            ("gear_power_step", self.gear_power_step),
            ("brake_power", self.brake_power),
            ("idle_decel", self.idle_decel),
            ("kmh_per_unit", self.kmh_per_unit),
            ("downshift_hysteresis", self.downshift_hysteresis),
            ("idle_rpm", self.idle_rpm),
            ("redline_rpm", self.redline_rpm),
            ("rpm_base", self.rpm_base),
            ("rpm_per_kmh", self.rpm_per_kmh),
            ("rpm_jitter", self.rpm_jitter),
            ("rpm_brake_drop", self.rpm_brake_drop),
            ("rpm_coast_drop", self.rpm_coast_drop),
            ("steering_speed", self.steering_speed),
            ("drift_steer_factor", self.drift_steer_factor),
            ("drift_yaw_factor", self.drift_yaw_factor),
            ("yaw_gain", self.yaw_gain),
            ("yaw_dead_zone", self.yaw_dead_zone),
            ("lean_gain", self.lean_gain),
            ("wheel_spin_gain", self.wheel_spin_gain),
            ("front_toe_gain", self.front_toe_gain),
        ];
        for (name, value) in scalars {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidTuning(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        let factors = [
            ("friction", self.friction),
            ("air_resistance", self.air_resistance),
            ("steering_return", self.steering_return),
            ("edge_bleed", self.edge_bleed),
        ];
        for (name, value) in factors {
            if !(value > 0.0 && value <= 1.0) {
                return Err(SimError::InvalidTuning(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        let positives = [
            ("kmh_per_unit", self.kmh_per_unit),
            ("max_steering", self.max_steering),
            ("lean_full_speed_kmh", self.lean_full_speed_kmh),
            ("road_half_width", self.road_half_width),
        ];
        for (name, value) in positives {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidTuning(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self.idle_rpm >= self.redline_rpm {
            return Err(SimError::InvalidTuning(format!(
                "idle_rpm {} must be below redline_rpm {}",
                self.idle_rpm, self.redline_rpm
            )));
        }

        let increasing = self
            .gear_thresholds
            .windows(2)
            .all(|pair| pair[0].is_finite() && pair[1].is_finite() && pair[0] < pair[1]);
        if !increasing {
            return Err(SimError::InvalidTuning(format!(
                "gear_thresholds must be strictly increasing, got {:?}",
                self.gear_thresholds
            )));
        }

        Ok(())
    }
}

/// Physical state of the vehicle after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleState {
    /// World-space position (meters)
    pub position: Vec3,
    /// Rotation about the vertical axis, wrapped to [-PI, PI]
    pub heading: f32,
    /// Cosmetic roll, derived each tick
    pub lean: f32,
    /// Signed velocity along the forward axis, units per tick
    pub velocity: f32,
    /// Velocity increment selected on the last tick
    pub acceleration: f32,
    pub steering: f32,
    pub gear: u8,
    pub rpm: f32,
    pub speed_kmh: f32,
    /// Cumulative wheel roll angle
    pub wheel_spin: f32,
    /// Visual yaw of the front wheels
    pub front_wheel_yaw: f32,
    pub drifting: bool,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self::at_rest(&VehicleTuning::default())
    }
}

impl VehicleState {
    /// Stationary at the origin, first gear, idling
    pub fn at_rest(tuning: &VehicleTuning) -> Self {
        Self {
            position: Vec3::ZERO,
            heading: 0.0,
            lean: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            steering: 0.0,
            gear: 1,
            rpm: tuning.idle_rpm,
            speed_kmh: 0.0,
            wheel_spin: 0.0,
            front_wheel_yaw: 0.0,
            drifting: false,
        }
    }

    /// Rotation from vehicle-local to world space (heading only)
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.heading)
    }

    /// Unit forward vector in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::Z
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            speed_kmh: KilometersPerHour(self.speed_kmh),
            gear: self.gear,
            rpm: Rpm(self.rpm),
            position: world_meters(self.position),
        }
    }
}

/// Convert a world-space vector to the published typed form
pub fn world_meters(v: Vec3) -> Vector3<Meters> {
    Vector3::new(Meters(v.x), Meters(v.y), Meters(v.z))
}

/// Source of the cosmetic RPM jitter
pub trait NoiseSource: Send + Sync {
    /// A sample in [0, 1)
    fn sample(&mut self) -> f32;
}

/// Silent noise source for deterministic runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn sample(&mut self) -> f32 {
        0.0
    }
}

/// Uniform jitter from a small fast PRNG
#[derive(Debug, Clone)]
pub struct RngNoise {
    rng: SmallRng,
}

impl RngNoise {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_os_rng() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }
}

impl NoiseSource for RngNoise {
    fn sample(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// Owns the vehicle state and advances it one tick at a time
pub struct VehicleDynamicsModel {
    tuning: VehicleTuning,
    state: VehicleState,
    noise: Box<dyn NoiseSource>,
}

impl VehicleDynamicsModel {
    pub fn new(tuning: VehicleTuning, noise: Box<dyn NoiseSource>) -> Self {
        let state = VehicleState::at_rest(&tuning);
        Self {
            tuning,
            state,
            noise,
        }
    }

    /// Model with RPM jitter disabled
    pub fn deterministic(tuning: VehicleTuning) -> Self {
        Self::new(tuning, Box::new(NoNoise))
    }

    /// Replace the current state, e.g. to resume from a saved pose
    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    /// Advance one fixed tick
    pub fn step(&mut self, input: &InputState) -> (VehicleState, TelemetrySnapshot) {
        let t = &self.tuning;
        let mut s = self.state;
        s.drifting = input.drift_held;

        // Accelerate wins over brake when both are held
        s.acceleration = if input.accelerate {
            t.engine_power * (1.0 + f32::from(s.gear) * t.gear_power_step)
        } else if input.brake {
            -t.brake_power
        } else {
            // Drag opposes motion and never pushes a stopped car backwards
            -s.velocity.signum() * t.idle_decel.min(s.velocity.abs())
        };

        s.rpm = if input.accelerate {
            let jitter = self.noise.sample();
            let jitter = if jitter.is_finite() {
                jitter.clamp(0.0, 1.0)
            } else {
                0.0
            };
            t.rpm_base + s.speed_kmh.abs() * t.rpm_per_kmh + jitter * t.rpm_jitter
        } else if input.brake {
            s.rpm - t.rpm_brake_drop
        } else {
            s.rpm - t.rpm_coast_drop
        };
        s.rpm = s.rpm.clamp(t.idle_rpm, t.redline_rpm);
        debug_assert!(s.rpm.is_finite(), "rpm diverged");

        s.velocity = (s.velocity + s.acceleration) * t.friction * t.air_resistance;
        debug_assert!(s.velocity.is_finite(), "velocity diverged");

        s.speed_kmh = if s.velocity.abs() < REST_EPSILON {
            0.0
        } else {
            s.velocity.abs() * t.kmh_per_unit
        };

        let gear = next_gear(t, s.gear, s.speed_kmh);
        if gear != s.gear {
            debug!(from = s.gear, to = gear, speed_kmh = s.speed_kmh, "gear shift");
            s.gear = gear;
        }

        let steer_rate = t.steering_speed * if s.drifting { t.drift_steer_factor } else { 1.0 };
        s.steering = if input.steer_left {
            (s.steering + steer_rate).min(t.max_steering)
        } else if input.steer_right {
            (s.steering - steer_rate).max(-t.max_steering)
        } else {
            s.steering * t.steering_return
        };
        s.steering = s.steering.clamp(-t.max_steering, t.max_steering);
        debug_assert!(s.steering.is_finite(), "steering diverged");

        if s.velocity.abs() > t.yaw_dead_zone {
            let drift = if s.drifting { t.drift_yaw_factor } else { 1.0 };
            s.heading += s.steering * s.velocity.abs() * t.yaw_gain * drift;
            if s.heading.abs() > PI {
                s.heading = (s.heading + PI).rem_euclid(TAU) - PI;
            }
        }
        s.lean = -s.steering * t.lean_gain * (s.speed_kmh / t.lean_full_speed_kmh).min(1.0);

        s.position += s.rotation() * Vec3::new(0.0, 0.0, s.velocity);

        s.wheel_spin += s.velocity * t.wheel_spin_gain;
        if s.wheel_spin.abs() > WHEEL_SPIN_WRAP {
            s.wheel_spin = s.wheel_spin.rem_euclid(TAU);
        }
        s.front_wheel_yaw = -s.steering * t.front_toe_gain;

        if s.position.x.abs() > t.road_half_width {
            debug!(x = s.position.x, "road edge contact");
            s.position.x = s.position.x.signum() * t.road_half_width;
            s.velocity *= t.edge_bleed;
        }

        self.state = s;
        (s, s.snapshot())
    }
}

/// At most one gear change per tick, with a hysteresis band on downshifts
fn next_gear(tuning: &VehicleTuning, gear: u8, speed_kmh: f32) -> u8 {
    let gear = gear.clamp(1, MAX_GEAR);
    let idx = usize::from(gear);
    let thresholds = &tuning.gear_thresholds;

    if gear < MAX_GEAR && speed_kmh > thresholds[idx] {
        gear + 1
    } else if gear > 1 && speed_kmh < thresholds[idx - 1] - tuning.downshift_hysteresis {
        gear - 1
    } else {
        gear
    }
}
