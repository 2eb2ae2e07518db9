//! Driving scenarios run through the public dynamics and loop API

use drive_core::{CameraMode, ControlEvent};
use drive_sim::{
    InputState, NoNoise, SimConfig, SimulationLoop, VehicleDynamicsModel, VehicleModel,
    VehicleState, VehicleTuning,
};
use glam::Vec3;

fn model() -> VehicleDynamicsModel {
    VehicleDynamicsModel::deterministic(VehicleTuning::default())
}

fn held(accelerate: bool, brake: bool, steer_left: bool) -> InputState {
    InputState {
        accelerate,
        brake,
        steer_left,
        ..InputState::default()
    }
}

#[test]
fn test_accelerating_from_rest_shifts_into_second() {
    let mut model = model();
    let mut previous_speed = 0.0;
    let mut shifted_at = None;

    for tick in 0..100 {
        let (state, telemetry) = model.step(&held(true, false, false));
        assert!(
            state.speed_kmh > previous_speed,
            "speed must keep rising, tick {}",
            tick
        );

        if previous_speed <= 30.0 && state.speed_kmh > 30.0 {
            assert_eq!(state.gear, 2, "upshift on the tick speed passes 30");
            shifted_at = Some(tick);
        } else if shifted_at.is_none() {
            assert_eq!(state.gear, 1);
        }
        assert_eq!(telemetry.gear, state.gear);
        previous_speed = state.speed_kmh;
    }

    assert!(shifted_at.is_some(), "never reached second gear");
    // Second gear tops out just under 66 km/h
    assert!(previous_speed < 66.0);
}

#[test]
fn test_sustained_acceleration_stays_below_ceiling() {
    let mut model = model();
    for _ in 0..600 {
        model.step(&held(true, false, false));
    }
    let state = model.state();
    assert_eq!(state.gear, 3);
    assert!(state.speed_kmh > 65.0);
    assert!(state.speed_kmh < 72.0);
}

#[test]
fn test_braking_from_65_downshifts_below_55() {
    let tuning = VehicleTuning::default();
    let start = VehicleState {
        velocity: 65.0 / tuning.kmh_per_unit,
        speed_kmh: 65.0,
        gear: 3,
        ..VehicleState::at_rest(&tuning)
    };
    let mut model = VehicleDynamicsModel::deterministic(tuning).with_state(start);

    let (first, _) = model.step(&held(false, true, false));
    assert!((first.speed_kmh - 57.68).abs() < 0.05);
    assert_eq!(first.gear, 3, "still inside the hysteresis band");

    let (second, _) = model.step(&held(false, true, false));
    assert!(second.speed_kmh < 55.0);
    assert_eq!(second.gear, 2);

    for _ in 0..5 {
        let (state, _) = model.step(&held(false, true, false));
        if state.speed_kmh >= 20.0 {
            assert_eq!(state.gear, 2);
        }
    }
}

#[test]
fn test_coasting_from_65_decays_and_downshifts() {
    let tuning = VehicleTuning::default();
    let start = VehicleState {
        velocity: 65.0 / tuning.kmh_per_unit,
        speed_kmh: 65.0,
        gear: 3,
        ..VehicleState::at_rest(&tuning)
    };
    let mut model = VehicleDynamicsModel::deterministic(tuning).with_state(start);

    let mut previous = 65.0;
    loop {
        let (state, _) = model.step(&InputState::default());
        assert!(state.speed_kmh < previous);
        previous = state.speed_kmh;
        if state.speed_kmh < 55.0 {
            assert_eq!(state.gear, 2);
            break;
        }
        assert_eq!(state.gear, 3);
    }
}

#[test]
fn test_camera_cycles_through_all_modes() {
    let mut sim = SimulationLoop::new(
        &SimConfig::default(),
        VehicleModel::fallback(),
        Box::new(NoNoise),
    );
    assert_eq!(sim.camera_mode(), CameraMode::Chase);

    let expected = [
        CameraMode::Hood,
        CameraMode::Cockpit,
        CameraMode::Side,
        CameraMode::Top,
        CameraMode::Chase,
    ];
    for mode in expected {
        sim.submit(&ControlEvent::pressed("c"));
        assert_eq!(sim.tick().camera.mode, mode);
        sim.submit(&ControlEvent::released("c"));
        assert_eq!(sim.tick().camera.mode, mode);
    }
}

#[test]
fn test_stationary_vehicle_steers_without_turning() {
    let mut parked = model();
    for _ in 0..10 {
        let (state, _) = parked.step(&held(false, false, true));
        assert_eq!(state.heading, 0.0);
    }
    assert!(parked.state().steering > 0.0);

    // Just inside the dead zone
    let crawling = VehicleState {
        velocity: 0.02,
        steering: 0.5,
        ..VehicleState::default()
    };
    let mut crawler = model().with_state(crawling);
    let (state, _) = crawler.step(&held(false, false, true));
    assert_eq!(state.heading, 0.0);
    assert!(state.steering > 0.5);
}

#[test]
fn test_rest_state_is_idempotent() {
    let mut model = model();
    for _ in 0..100 {
        let (state, telemetry) = model.step(&InputState::default());
        assert_eq!(state.position, Vec3::ZERO);
        assert_eq!(state.velocity, 0.0);
        assert_eq!(state.heading, 0.0);
        assert_eq!(state.gear, 1);
        assert_eq!(telemetry.display_speed(), 0);
    }
}

#[test]
fn test_coasting_velocity_decays_monotonically_to_zero() {
    let start = VehicleState {
        velocity: 3.0,
        ..VehicleState::default()
    };
    let mut model = model().with_state(start);

    let mut previous = 3.0_f32;
    for _ in 0..400 {
        let (state, _) = model.step(&InputState::default());
        assert!(state.velocity.abs() <= previous);
        previous = state.velocity.abs();
    }
    assert_eq!(previous, 0.0);
}

#[test]
fn test_hard_left_at_road_edge_stays_contained() {
    let start = VehicleState {
        position: Vec3::new(6.9, 0.0, 0.0),
        velocity: 2.0,
        ..VehicleState::default()
    };
    let mut model = model().with_state(start);

    let mut touched = false;
    for _ in 0..500 {
        let (state, _) = model.step(&held(true, false, true));
        assert!(state.position.x <= 7.0, "escaped road at x={}", state.position.x);
        assert!(state.position.x >= -7.0);
        touched |= state.position.x == 7.0;
    }
    assert!(touched, "never reached the road edge");
}
