//! Simulation configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Lookup order: the file named by `DRIVE_SIM_CONFIG`, then
//! `<config dir>/drive-sim/config.json`, then built-in defaults.

use crate::camera::CAMERA_SMOOTHING;
use crate::dynamics::{NoNoise, NoiseSource, RngNoise, VehicleTuning};
use crate::input::KeyBindings;
use crate::vehicle::{AssetLoader, FallbackLoader, JsonModelLoader};
use drive_core::{CameraMode, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DRIVE_SIM_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub initial_mode: CameraMode,
    /// Per-tick blend toward the desired pose, in (0, 1]
    pub smoothing: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            initial_mode: CameraMode::Chase,
            smoothing: CAMERA_SMOOTHING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate_hz: u32,
    /// Most ticks run for one frame before the backlog is dropped
    pub max_catch_up_ticks: u32,
    pub tuning: VehicleTuning,
    pub bindings: KeyBindings,
    pub camera: CameraSettings,
    /// Cosmetic RPM jitter while accelerating
    pub rpm_jitter: bool,
    /// Seed for reproducible jitter
    pub noise_seed: Option<u64>,
    /// JSON vehicle descriptor; the built-in vehicle when unset
    pub vehicle_model: Option<PathBuf>,
    /// Use the built-in vehicle when the descriptor fails to load
    pub asset_fallback: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            max_catch_up_ticks: 5,
            tuning: VehicleTuning::default(),
            bindings: KeyBindings::default(),
            camera: CameraSettings::default(),
            rpm_jitter: true,
            noise_seed: None,
            vehicle_model: None,
            asset_fallback: false,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let config_error = |reason: String| SimError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config = Self::from_json_str(&text).map_err(|e| config_error(e.to_string()))?;
        config.validate().map_err(|e| config_error(e.to_string()))?;
        Ok(config)
    }

    /// `<config dir>/drive-sim/config.json`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("drive-sim").join("config.json"))
    }

    /// Resolve configuration from the environment, the user config dir, or
    /// defaults
    pub fn load() -> Result<Self, SimError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::from_file(&path);
        }

        if let Some(path) = Self::default_path().filter(|p| p.exists()) {
            info!("Loading config from {}", path.display());
            return Self::from_file(&path);
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err(SimError::InvalidTuning(format!(
                "tick_rate_hz must be in 1..=1000, got {}",
                self.tick_rate_hz
            )));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(SimError::InvalidTuning(
                "max_catch_up_ticks must be at least 1".to_string(),
            ));
        }
        let smoothing = self.camera.smoothing;
        if !(smoothing > 0.0 && smoothing <= 1.0) {
            return Err(SimError::InvalidTuning(format!(
                "camera smoothing must be in (0, 1], got {}",
                smoothing
            )));
        }
        self.tuning.validate()
    }

    /// Build the RPM jitter source this config asks for
    pub fn noise_source(&self) -> Box<dyn NoiseSource> {
        match (self.rpm_jitter, self.noise_seed) {
            (false, _) => Box::new(NoNoise),
            (true, Some(seed)) => Box::new(RngNoise::seeded(seed)),
            (true, None) => Box::new(RngNoise::from_os_rng()),
        }
    }

    /// Build the vehicle asset loader this config asks for
    pub fn asset_loader(&self) -> Box<dyn AssetLoader> {
        match &self.vehicle_model {
            Some(path) => Box::new(JsonModelLoader::new(path)),
            None => Box::new(FallbackLoader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = SimConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.tick_rate_hz, 60);
        assert_eq!(config.tuning.max_steering, 0.6);
        assert!(!config.asset_fallback);
    }

    #[test]
    fn test_partial_override() {
        let config = SimConfig::from_json_str(
            r#"{
                "tick_rate_hz": 120,
                "tuning": { "engine_power": 0.3 },
                "camera": { "initial_mode": "top" },
                "rpm_jitter": false
            }"#,
        )
        .unwrap();
        assert_eq!(config.tick_rate_hz, 120);
        assert_eq!(config.tuning.engine_power, 0.3);
        assert_eq!(config.tuning.brake_power, 0.4);
        assert_eq!(config.camera.initial_mode, CameraMode::Top);
        assert_eq!(config.camera.smoothing, CAMERA_SMOOTHING);
        assert!(!config.rpm_jitter);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SimConfig::default();
        config.tick_rate_hz = 0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.camera.smoothing = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.tuning.air_resistance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_path() {
        let path = std::env::temp_dir().join(format!("drive-sim-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();

        match SimConfig::from_file(&path) {
            Err(SimError::Config { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected config error, got {:?}", other),
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = SimConfig::from_file(Path::new("/nonexistent/drive-sim.json"));
        assert!(matches!(result, Err(SimError::Config { .. })));
    }

    #[test]
    fn test_factories_follow_settings() {
        let mut config = SimConfig::default();
        config.rpm_jitter = false;
        let mut noise = config.noise_source();
        assert_eq!(noise.sample(), 0.0);

        assert_eq!(config.asset_loader().describe(), "built-in vehicle");
        config.vehicle_model = Some(PathBuf::from("car.json"));
        assert!(config.asset_loader().describe().contains("car.json"));
    }
}
