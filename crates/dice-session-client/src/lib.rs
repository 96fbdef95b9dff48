// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Viewer-side replica of the dice hub, plus tool-facing adapters
//! (channels + ports).
//!
//! A [`Replica`] runs the same simulator as the hub. Local actions are
//! applied immediately so the UI can show them, and the matching
//! [`ClientMessage`] is returned for the caller to send. Snapshots from the
//! hub always win: [`Replica::apply`] overwrites local state and reports how
//! the preceding prediction fared.

use dice_core::{Cube, Point2, Simulator, SimulatorState, StateError, Walls};
use dice_session_proto::{AppearanceSlot, AppearanceTable, ClientId, ClientMessage, ServerMessage};
use tracing::{debug, warn};

pub mod tool;

/// Largest per-number difference at which a prediction counts as confirmed.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Frames a pending prediction may be advanced to meet the hub's snapshot.
const MAX_CATCH_UP_FRAMES: u64 = 10_000;

/// Outcome of applying one hub frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The replica was rebuilt from an `init` frame.
    Initialized,
    /// Echo of our own action, matching the local prediction.
    Confirmed {
        /// Largest difference observed.
        max_diff: f64,
    },
    /// Echo of our own action that disagreed with (or could not be compared
    /// to) the local prediction.
    Corrected {
        /// Largest difference, when the states were comparable.
        max_diff: Option<f64>,
    },
    /// Snapshot caused by another viewer, or a periodic resync.
    Foreign,
    /// Appearance table replaced.
    AppearanceUpdated,
    /// Snapshot older than one already applied; ignored.
    Stale {
        /// Frame of the ignored snapshot.
        frame: u64,
    },
}

/// Local copy of the shared dice world.
#[derive(Debug, Clone)]
pub struct Replica {
    client_id: ClientId,
    sim: Simulator,
    appearance: AppearanceTable,
    pending: Option<Simulator>,
    last_authority_frame: Option<u64>,
    tolerance: f64,
}

impl Replica {
    /// Creates a replica with `slots` hidden cubes; it becomes useful once an
    /// `init` frame arrives.
    pub fn new(client_id: impl Into<ClientId>, slots: usize, walls: Option<Walls>) -> Self {
        Self {
            client_id: client_id.into(),
            sim: hidden_world(slots, walls),
            appearance: AppearanceTable::new(slots),
            pending: None,
            last_authority_frame: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    /// Overrides [`DEFAULT_TOLERANCE`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Identifier sent with our taps.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Local simulator.
    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Local appearance table.
    pub fn appearance(&self) -> &AppearanceTable {
        &self.appearance
    }

    /// True while a tap is waiting for its echo.
    pub fn has_pending_prediction(&self) -> bool {
        self.pending.is_some()
    }

    /// Advances the local simulator by one tick.
    pub fn tick(&mut self) {
        self.sim.update();
    }

    /// Applies a tap locally and returns the message announcing it, or
    /// `None` when no visible cube is close enough to react.
    pub fn tap(&mut self, position: Point2) -> Option<ClientMessage> {
        if !self.sim.has_tap_target_cube(position) {
            return None;
        }
        self.sim.tap_position(position);
        self.pending = Some(self.sim.clone());
        Some(ClientMessage::Tap {
            position,
            client_id: Some(self.client_id.clone()),
        })
    }

    /// Hides slots locally and returns the message announcing it.
    pub fn hide(&mut self, ids: &[usize]) -> ClientMessage {
        self.sim.hide(ids);
        ClientMessage::Hide {
            ids: wire_ids(ids),
        }
    }

    /// Throws slots locally and returns the message announcing it.
    pub fn throw(&mut self, ids: &[usize], seed: f64) -> ClientMessage {
        self.sim.throw(ids, seed);
        ClientMessage::Throw {
            ids: wire_ids(ids),
            seed,
        }
    }

    /// Updates one appearance slot locally and returns the message
    /// announcing it.
    pub fn set_appearance(&mut self, id: usize, data: AppearanceSlot) -> ClientMessage {
        let id = i64::try_from(id).unwrap_or(i64::MAX);
        self.appearance.set(id, data.clone());
        ClientMessage::Update { id, data }
    }

    /// Applies a hub frame.
    ///
    /// Snapshots replace the local state unless they are older than the last
    /// snapshot applied, in which case they are reported as
    /// [`Reconciliation::Stale`] and ignored. A `cubes` frame carrying our
    /// own client id is compared against the pending prediction first, after
    /// advancing the prediction to the snapshot's frame.
    pub fn apply(&mut self, msg: ServerMessage) -> Result<Reconciliation, StateError> {
        match msg {
            ServerMessage::Init { state, appearance } => {
                let mut sim = hidden_world(state.cubes.len(), self.sim.walls());
                sim.replace_state(&state)?;
                self.sim = sim;
                self.appearance = appearance;
                self.pending = None;
                self.last_authority_frame = Some(state.frame);
                debug!(frame = state.frame, slots = state.cubes.len(), "replica initialized");
                Ok(Reconciliation::Initialized)
            }
            ServerMessage::Cubes { state, client_id } => {
                if self.last_authority_frame.is_some_and(|last| state.frame < last) {
                    debug!(frame = state.frame, "ignoring stale snapshot");
                    return Ok(Reconciliation::Stale { frame: state.frame });
                }
                self.sim.replace_state(&state)?;
                self.last_authority_frame = Some(state.frame);
                if client_id.as_deref() != Some(self.client_id.as_str()) {
                    return Ok(Reconciliation::Foreign);
                }
                let max_diff = self
                    .pending
                    .take()
                    .and_then(|predicted| compare_at_frame(predicted, &state));
                match max_diff {
                    Some(max_diff) if max_diff <= self.tolerance => {
                        Ok(Reconciliation::Confirmed { max_diff })
                    }
                    max_diff => {
                        warn!(frame = state.frame, ?max_diff, "prediction corrected by hub");
                        Ok(Reconciliation::Corrected { max_diff })
                    }
                }
            }
            ServerMessage::Appearance { appearance } => {
                self.appearance = appearance;
                Ok(Reconciliation::AppearanceUpdated)
            }
        }
    }
}

fn hidden_world(slots: usize, walls: Option<Walls>) -> Simulator {
    Simulator::from_cubes(vec![Cube::hidden_at_origin(); slots], walls)
}

fn wire_ids(ids: &[usize]) -> Vec<i64> {
    ids.iter().filter_map(|&i| i64::try_from(i).ok()).collect()
}

fn compare_at_frame(mut predicted: Simulator, state: &SimulatorState) -> Option<f64> {
    let behind = state.frame.checked_sub(predicted.frame())?;
    if behind > MAX_CATCH_UP_FRAMES {
        return None;
    }
    for _ in 0..behind {
        predicted.update();
    }
    predicted.current_state().max_abs_diff(state)
}
