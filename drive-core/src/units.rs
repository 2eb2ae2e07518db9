//! Type-safe wrappers for physical units
//!
//! Newtype wrappers around f32 so that positions, angles, engine speed and
//! road speed cannot be mixed up at the telemetry boundary.
//!
//! All unit types serialize with 4 decimal places to reduce JSON payload size.

use serde::{Deserialize, Serialize};

/// Round f32 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f32, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f32((*val * 10000.0).round() / 10000.0)
}

/// Meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Meters(#[serde(serialize_with = "round4")] pub f32);

/// Kilometers per hour (display speed)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f32);

impl KilometersPerHour {
    /// Speed rounded to a whole number, as shown on the dashboard
    pub fn rounded(&self) -> u32 {
        self.0.max(0.0).round() as u32
    }
}

/// Radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Radians(#[serde(serialize_with = "round4")] pub f32);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round4")] pub f32);

/// Percentage (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Percentage(#[serde(serialize_with = "round4")] pub f32);

impl Percentage {
    /// Create a new percentage, clamping to [0.0, 1.0]
    pub fn new(value: f32) -> Self {
        Self(value.clamp(0.0, 1.0))
    }
}
