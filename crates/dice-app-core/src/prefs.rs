// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved preferences for the dice hub service.

use serde::{Deserialize, Serialize};

/// Config key under which [`HubPrefs`] are stored.
pub const HUB_PREFS_KEY: &str = "dice_hub";

/// Hub runtime knobs. Missing fields fall back to their defaults so older
/// config files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubPrefs {
    /// Socket address to bind (e.g. `0.0.0.0:8080`).
    pub listen: String,
    /// Simulation tick period in milliseconds.
    pub tick_ms: u64,
    /// Delay before an inbound action is applied, in milliseconds.
    pub action_delay_ms: u64,
    /// Broadcast a resync every N frames while moving; 0 disables.
    pub sync_every_frames: u64,
    /// Number of cube slots.
    pub cube_count: usize,
    /// Floor half-width along X; `None` leaves the floor unbounded.
    pub x_wall: Option<f64>,
    /// Floor half-depth along Y; `None` leaves the floor unbounded.
    pub y_wall: Option<f64>,
    /// Largest inbound frame accepted, in bytes.
    pub max_frame_bytes: usize,
    /// Allowed `Origin` header values; empty allows any origin.
    pub allow_origin: Vec<String>,
}

impl Default for HubPrefs {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            tick_ms: 16,
            action_delay_ms: 200,
            sync_every_frames: 120,
            cube_count: 2,
            x_wall: None,
            y_wall: None,
            max_frame_bytes: 64 * 1024,
            allow_origin: Vec::new(),
        }
    }
}

impl HubPrefs {
    /// Floor bounds as `(x, y)`; present only when both walls are set.
    pub fn walls(&self) -> Option<(f64, f64)> {
        self.x_wall.zip(self.y_wall)
    }
}
