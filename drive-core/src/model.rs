//! Published simulation data model
//!
//! Defines the per-tick records the simulation hands to its external
//! collaborators (renderer, HUD, recorders) and the raw control events it
//! accepts from the input collaborator.
//!
//! Coordinate system: Right-handed, Y up
//! - X: Lateral (positive = left of the road centre line when facing +Z)
//! - Y: Up
//! - Z: Forward along the road at heading 0

use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Engine speed at which the dashboard RPM bar is full
pub const DASHBOARD_REDLINE_RPM: f32 = 7500.0;

/// 3D vector with typed components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl<T> Vector3<T> {
    pub fn new(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }
}

/// Read-only telemetry produced fresh each tick for the HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub speed_kmh: KilometersPerHour,
    pub gear: u8,
    pub rpm: Rpm,
    pub position: Vector3<Meters>,
}

impl TelemetrySnapshot {
    /// Fill level of the dashboard RPM bar
    pub fn rpm_fraction(&self) -> Percentage {
        Percentage::new(self.rpm.0 / DASHBOARD_REDLINE_RPM)
    }

    /// Colour band of the dashboard RPM bar
    pub fn rpm_band(&self) -> RpmBand {
        RpmBand::for_rpm(self.rpm)
    }

    /// Speed as shown on the speedometer
    pub fn display_speed(&self) -> u32 {
        self.speed_kmh.rounded()
    }
}

/// Dashboard RPM bar colour bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpmBand {
    Normal,
    High,
    Redline,
}

impl RpmBand {
    pub fn for_rpm(rpm: Rpm) -> Self {
        if rpm.0 > 6500.0 {
            RpmBand::Redline
        } else if rpm.0 > 5000.0 {
            RpmBand::High
        } else {
            RpmBand::Normal
        }
    }
}

/// Named camera presets, cycled by the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Chase,
    Hood,
    Cockpit,
    Side,
    Top,
}

impl CameraMode {
    /// All modes in cycle order
    pub const ALL: [CameraMode; 5] = [
        CameraMode::Chase,
        CameraMode::Hood,
        CameraMode::Cockpit,
        CameraMode::Side,
        CameraMode::Top,
    ];

    /// The mode selected by one cycle request
    pub fn next(self) -> Self {
        match self {
            CameraMode::Chase => CameraMode::Hood,
            CameraMode::Hood => CameraMode::Cockpit,
            CameraMode::Cockpit => CameraMode::Side,
            CameraMode::Side => CameraMode::Top,
            CameraMode::Top => CameraMode::Chase,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraMode::Chase => "chase",
            CameraMode::Hood => "hood",
            CameraMode::Cockpit => "cockpit",
            CameraMode::Side => "side",
            CameraMode::Top => "top",
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        CameraMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| format!("unknown camera mode: {}", s))
    }
}

/// Viewing transform for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub mode: CameraMode,
    pub position: Vector3<Meters>,
    pub look_at: Vector3<Meters>,
}

/// Wheel slot on the vehicle body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPosition {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelPosition {
    pub const ALL: [WheelPosition; 4] = [
        WheelPosition::FrontLeft,
        WheelPosition::FrontRight,
        WheelPosition::RearLeft,
        WheelPosition::RearRight,
    ];

    pub fn is_front(&self) -> bool {
        matches!(self, WheelPosition::FrontLeft | WheelPosition::FrontRight)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelPosition::FrontLeft | WheelPosition::RearLeft)
    }
}

/// Per-wheel render state: rolling angle and visual steer (toe) angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelPose {
    pub wheel: WheelPosition,
    pub spin: Radians,
    pub steer: Radians,
}

/// Raw key transition from the input collaborator
///
/// Keys are matched case-insensitively against the configured bindings,
/// e.g. `"w"`, `"ArrowUp"`, `" "` (space).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub key: String,
    pub pressed: bool,
}

impl ControlEvent {
    pub fn pressed(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pressed: true,
        }
    }

    pub fn released(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pressed: false,
        }
    }
}

/// Lifecycle state of a telemetry source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Stopped,
    /// Initialization failed; the simulation was never started
    Failed { reason: String },
}

/// One published tick of the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Timestamp when this frame was produced
    pub timestamp: DateTime<Utc>,

    /// Name of the producing source
    pub source: String,

    /// Logical tick counter, starting at 1
    pub tick: u64,

    // === Dashboard ===
    pub speed_kmh: KilometersPerHour,
    pub gear: u8,
    pub rpm: Rpm,

    // === Pose ===
    /// World-space position (meters)
    pub position: Vector3<Meters>,

    /// Rotation about the vertical axis
    pub heading: Radians,

    /// Cosmetic body roll
    pub lean: Radians,

    /// Front wheel steering angle
    pub steering: Radians,

    pub drifting: bool,

    // === Driver intents ===
    pub throttle: bool,
    pub brake: bool,

    // === Render ===
    pub camera: CameraPose,
    pub wheels: Vec<WheelPose>,

    /// Source-specific data that doesn't fit the common model
    pub extras: HashMap<String, serde_json::Value>,
}

impl TelemetryFrame {
    /// The HUD subset of this frame
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            speed_kmh: self.speed_kmh,
            gear: self.gear,
            rpm: self.rpm,
            position: self.position,
        }
    }

    /// Serialize this frame respecting the given field mask
    ///
    /// If mask is None or includes all fields, serialize everything.
    /// Otherwise `timestamp`, `source` and `tick` are always kept and every
    /// other top-level field only when the mask names it.
    pub fn to_json_filtered(&self, mask: Option<&FieldMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(mask) if !mask.is_all() => mask,
            _ => return serde_json::to_string(self),
        };

        let mut map = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map,
            other => return serde_json::to_string(&other),
        };

        map.retain(|key, value| {
            if ALWAYS_INCLUDED.contains(&key.as_str()) {
                return true;
            }
            if key == "extras" && value.as_object().is_some_and(|extras| extras.is_empty()) {
                return false;
            }
            mask.includes(key)
        });

        serde_json::to_string(&map)
    }
}

const ALWAYS_INCLUDED: [&str; 3] = ["timestamp", "source", "tick"];

// === Field Masking for Selective Output ===

/// Specifies which fields to include in serialized output
///
/// This is used to reduce bandwidth for HUD clients that only need a few
/// gauges.
#[derive(Debug, Clone, Default)]
pub struct FieldMask {
    fields: HashSet<String>,
    include_all: bool,
}

impl FieldMask {
    /// Create a mask that includes all fields
    pub fn all() -> Self {
        Self {
            fields: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of field names
    pub fn parse(fields: &str) -> Self {
        let fields: HashSet<String> = fields
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            fields,
            include_all: false,
        }
    }

    /// Check if a field should be included
    pub fn includes(&self, field: &str) -> bool {
        self.include_all || self.fields.contains(&field.to_lowercase())
    }

    /// Check if all fields should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for FieldMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
