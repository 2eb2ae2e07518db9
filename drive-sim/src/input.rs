//! Logical driver input
//!
//! Raw key transitions from the input collaborator are folded into
//! [`RawControls`]; once per tick an [`InputSampler`] maps the held keys to
//! the five driving intents through the configured synonym bindings and
//! derives the edge-triggered camera cycle request.

use drive_core::ControlEvent;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Normalize a raw key name for matching
///
/// Keys compare case-insensitively; the space bar is accepted as `" "`,
/// `"space"` or `"spacebar"`.
pub fn normalize_key(key: &str) -> String {
    if key == " " {
        return "space".to_string();
    }
    match key.trim().to_lowercase().as_str() {
        "spacebar" => "space".to_string(),
        other => other.to_string(),
    }
}

/// Synonym keys for each logical control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub accelerate: Vec<String>,
    pub brake: Vec<String>,
    pub steer_left: Vec<String>,
    pub steer_right: Vec<String>,
    pub drift: Vec<String>,
    pub cycle_camera: Vec<String>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = |names: &[&str]| -> Vec<String> {
            names.iter().map(|k| k.to_string()).collect()
        };
        Self {
            accelerate: keys(&["w", "arrowup"]),
            brake: keys(&["s", "arrowdown"]),
            steer_left: keys(&["a", "arrowleft"]),
            steer_right: keys(&["d", "arrowright"]),
            drift: keys(&["space"]),
            cycle_camera: keys(&["c"]),
        }
    }
}

impl KeyBindings {
    /// Copy of these bindings with every key normalized
    pub fn normalized(&self) -> Self {
        let norm = |keys: &[String]| -> Vec<String> {
            keys.iter().map(|k| normalize_key(k)).collect()
        };
        Self {
            accelerate: norm(&self.accelerate),
            brake: norm(&self.brake),
            steer_left: norm(&self.steer_left),
            steer_right: norm(&self.steer_right),
            drift: norm(&self.drift),
            cycle_camera: norm(&self.cycle_camera),
        }
    }

    /// Every normalized key bound to some control
    pub fn bound_keys(&self) -> HashSet<String> {
        [
            &self.accelerate,
            &self.brake,
            &self.steer_left,
            &self.steer_right,
            &self.drift,
            &self.cycle_camera,
        ]
        .into_iter()
        .flatten()
        .map(|k| normalize_key(k))
        .collect()
    }
}

/// Bound keys currently held, plus bound keys that went down since the
/// last tick
#[derive(Debug, Clone)]
pub struct RawControls {
    bound: HashSet<String>,
    held: HashSet<String>,
    pressed: HashSet<String>,
}

impl RawControls {
    pub fn new(bindings: &KeyBindings) -> Self {
        Self {
            bound: bindings.bound_keys(),
            held: HashSet::new(),
            pressed: HashSet::new(),
        }
    }

    /// Fold one key transition in. Keys no control is bound to are
    /// ignored. Auto-repeat presses of a key that is already held do not
    /// count as a new press.
    pub fn apply(&mut self, event: &ControlEvent) {
        let key = normalize_key(&event.key);
        if !self.bound.contains(&key) {
            return;
        }
        if event.pressed {
            if self.held.insert(key.clone()) {
                self.pressed.insert(key);
            }
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn was_pressed(&self, key: &str) -> bool {
        self.pressed.contains(key)
    }

    /// Forget press latches once a tick has sampled them
    pub fn end_tick(&mut self) {
        self.pressed.clear();
    }

    pub fn release_all(&mut self) {
        self.held.clear();
        self.pressed.clear();
    }
}

/// Driving intents for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub accelerate: bool,
    pub brake: bool,
    pub steer_left: bool,
    pub steer_right: bool,
    pub drift_held: bool,
    /// True only on the tick the camera control went down
    pub cycle_camera_requested: bool,
}

/// Turns raw held keys into an [`InputState`] once per tick
#[derive(Debug, Clone)]
pub struct InputSampler {
    bindings: KeyBindings,
    camera_held: bool,
}

impl InputSampler {
    pub fn new(bindings: &KeyBindings) -> Self {
        Self {
            bindings: bindings.normalized(),
            camera_held: false,
        }
    }

    pub fn update(&mut self, raw: &RawControls) -> InputState {
        let held = |keys: &[String]| keys.iter().any(|k| raw.is_held(k));

        let camera_held = held(&self.bindings.cycle_camera);
        let camera_tapped = self.bindings.cycle_camera.iter().any(|k| raw.was_pressed(k));
        let cycle_camera_requested = camera_tapped || (camera_held && !self.camera_held);
        self.camera_held = camera_held;

        InputState {
            accelerate: held(&self.bindings.accelerate),
            brake: held(&self.bindings.brake),
            steer_left: held(&self.bindings.steer_left),
            steer_right: held(&self.bindings.steer_right),
            drift_held: held(&self.bindings.drift),
            cycle_camera_requested,
        }
    }
}
