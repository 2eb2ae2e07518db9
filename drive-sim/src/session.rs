//! Drive session: the simulation as a telemetry source a host can drive

use crate::config::SimConfig;
use crate::sim_loop::{SimulationLoop, TickOutput};
use crate::vehicle::{AssetLoader, VehicleModel};
use anyhow::Result;
use chrono::Utc;
use drive_core::units::Radians;
use drive_core::{ControlEvent, SessionStatus, SimError, TelemetryFrame, TelemetrySource};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct DriveSession {
    config: SimConfig,
    loader: Box<dyn AssetLoader>,
    sim: Option<SimulationLoop>,
    status: SessionStatus,
}

impl DriveSession {
    pub fn new(config: SimConfig) -> Self {
        let loader = config.asset_loader();
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: SimConfig, loader: Box<dyn AssetLoader>) -> Self {
        Self {
            config,
            loader,
            sim: None,
            status: SessionStatus::Idle,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The running simulation, if any
    pub fn simulation(&self) -> Option<&SimulationLoop> {
        self.sim.as_ref()
    }

    fn fail(&mut self, err: SimError) -> anyhow::Error {
        error!("Failed to start session: {}", err);
        self.status = SessionStatus::Failed {
            reason: err.to_string(),
        };
        err.into()
    }

    fn load_vehicle(&self) -> Result<VehicleModel, SimError> {
        match self.loader.load_vehicle() {
            Ok(model) => Ok(model),
            Err(err) if self.config.asset_fallback => {
                warn!("{}; using built-in vehicle", err);
                Ok(VehicleModel::fallback())
            }
            Err(err) => Err(err),
        }
    }

    fn frame(&self, out: TickOutput) -> TelemetryFrame {
        let mut extras = HashMap::new();
        extras.insert("rpm_band".to_string(), json!(out.telemetry.rpm_band()));
        extras.insert("display_speed".to_string(), json!(out.telemetry.display_speed()));
        extras.insert("rpm_fraction".to_string(), json!(out.telemetry.rpm_fraction().0));
        extras.insert("velocity".to_string(), json!(out.vehicle.velocity));
        if let Some(sim) = &self.sim {
            extras.insert("vehicle".to_string(), json!(sim.vehicle_model().name));
        }

        TelemetryFrame {
            timestamp: Utc::now(),
            source: self.name().to_string(),
            tick: out.tick,
            speed_kmh: out.telemetry.speed_kmh,
            gear: out.telemetry.gear,
            rpm: out.telemetry.rpm,
            position: out.telemetry.position,
            heading: Radians(out.vehicle.heading),
            lean: Radians(out.vehicle.lean),
            steering: Radians(out.vehicle.steering),
            drifting: out.vehicle.drifting,
            throttle: out.input.accelerate,
            brake: out.input.brake,
            camera: out.camera,
            wheels: out.wheels,
            extras,
        }
    }
}

impl TelemetrySource for DriveSession {
    fn key(&self) -> &str {
        "drive"
    }

    fn name(&self) -> &str {
        "DriveSim"
    }

    fn start(&mut self) -> Result<()> {
        if self.sim.is_some() {
            return Ok(());
        }

        if let Err(err) = self.config.validate() {
            return Err(self.fail(err));
        }

        info!("Loading {}", self.loader.describe());
        let model = match self.load_vehicle() {
            Ok(model) => model,
            Err(err) => return Err(self.fail(err)),
        };

        self.sim = Some(SimulationLoop::new(
            &self.config,
            model,
            self.config.noise_source(),
        ));
        self.status = SessionStatus::Running;
        info!("Session started at {} Hz", self.config.tick_rate_hz);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(mut sim) = self.sim.take() {
            sim.release_inputs();
            info!("Session stopped after {} ticks", sim.tick_count());
            self.status = SessionStatus::Stopped;
        }
        Ok(())
    }

    fn submit(&mut self, event: ControlEvent) -> Result<()> {
        match self.sim.as_mut() {
            Some(sim) => {
                sim.submit(&event);
                Ok(())
            }
            None => Err(SimError::NotRunning.into()),
        }
    }

    fn read_frame(&mut self, elapsed: Duration) -> Result<Option<TelemetryFrame>> {
        let out = match self.sim.as_mut() {
            Some(sim) => sim.advance(elapsed),
            None => return Ok(None),
        };
        Ok(out.map(|out| self.frame(out)))
    }

    fn status(&self) -> SessionStatus {
        self.status.clone()
    }
}
