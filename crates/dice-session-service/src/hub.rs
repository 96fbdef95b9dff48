// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared hub state: the authoritative simulator, the appearance table and
//! the set of connected viewers.
//!
//! Every mutation of the simulator happens under the hub mutex, either from
//! the tick loop or from a delayed action task. Outbound frames are queued
//! into every viewer's outbox inside that same critical section, so each
//! viewer sees snapshots in frame order. Queuing never waits: a viewer whose
//! outbox is full or closed is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use dice_core::Simulator;
use dice_session_proto::{
    encode_server, slot_indices, AppearanceTable, ClientMessage, ServerMessage,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Outbound queue depth per viewer. A viewer that falls this many frames
/// behind is disconnected.
pub const OUTBOX_CAPACITY: usize = 256;

pub struct ConnState {
    tx: mpsc::Sender<String>,
}

pub struct HubState {
    sim: Simulator,
    appearance: AppearanceTable,
    sync_every_frames: u64,
    next_conn_id: u64,
    conns: HashMap<u64, ConnState>,
}

pub type SharedHub = Arc<Mutex<HubState>>;

impl HubState {
    pub fn new(sim: Simulator, sync_every_frames: u64) -> Self {
        Self {
            appearance: AppearanceTable::new(sim.len()),
            sim,
            sync_every_frames,
            next_conn_id: 0,
            conns: HashMap::new(),
        }
    }

    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    pub fn conn_count(&self) -> usize {
        self.conns.len()
    }

    /// Registers a viewer and queues its `init` frame.
    pub fn add_conn(&mut self, tx: mpsc::Sender<String>) -> Result<u64> {
        let init = encode_server(&ServerMessage::Init {
            state: self.sim.current_state(),
            appearance: self.appearance.clone(),
        })?;
        // A fresh outbox always has room for the first frame.
        if tx.try_send(init).is_err() {
            anyhow::bail!("viewer outbox closed before init");
        }
        let id = self.next_conn_id;
        self.next_conn_id += 1;
        self.conns.insert(id, ConnState { tx });
        Ok(id)
    }

    pub fn remove_conn(&mut self, conn_id: u64) {
        self.conns.remove(&conn_id);
    }

    /// Applies one viewer action, returning the frame to broadcast (if any).
    pub fn apply(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Tap {
                position,
                client_id,
            } => {
                if self.sim.has_tap_target_cube(position) {
                    self.sim.tap_position(position);
                } else {
                    debug!(x = position.x, y = position.y, "tap missed every cube");
                }
                Some(self.cubes_frame(client_id))
            }
            ClientMessage::Hide { ids } => {
                self.sim.hide(&slot_indices(&ids));
                Some(self.cubes_frame(None))
            }
            ClientMessage::Throw { ids, seed } => {
                self.sim.throw(&slot_indices(&ids), seed);
                Some(self.cubes_frame(None))
            }
            ClientMessage::Update { id, data } => {
                if !self.appearance.set(id, data) {
                    debug!(id, "appearance update for unknown slot");
                    return None;
                }
                Some(ServerMessage::Appearance {
                    appearance: self.appearance.clone(),
                })
            }
            ClientMessage::Unrecognized => None,
        }
    }

    /// Advances the simulator one tick, returning a resync frame when one is
    /// due: every `sync_every_frames` frames while moving, and once on the
    /// tick the world comes to rest.
    pub fn tick(&mut self) -> Option<ServerMessage> {
        let was_stopped = self.sim.is_stopped();
        self.sim.update();
        let settled = !was_stopped && self.sim.is_stopped();
        let periodic = !self.sim.is_stopped()
            && self.sync_every_frames > 0
            && self.sim.frame() % self.sync_every_frames == 0;
        (settled || periodic).then(|| self.cubes_frame(None))
    }

    fn cubes_frame(&self, client_id: Option<String>) -> ServerMessage {
        ServerMessage::Cubes {
            state: self.sim.current_state(),
            client_id,
        }
    }

    /// Encodes `msg` and queues it on every viewer's outbox without waiting.
    /// Viewers whose outbox is full or closed are removed.
    pub fn publish(&mut self, msg: &ServerMessage) -> Result<()> {
        let text = encode_server(msg)?;
        let mut dropped = Vec::new();
        for (&conn_id, conn) in &self.conns {
            match conn.tx.try_send(text.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(conn_id, "viewer outbox full; disconnecting");
                    dropped.push(conn_id);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(conn_id, "viewer outbox closed; dropping");
                    dropped.push(conn_id);
                }
            }
        }
        for conn_id in dropped {
            self.remove_conn(conn_id);
        }
        Ok(())
    }
}

/// Applies an inbound action after `delay` and broadcasts the result.
pub async fn handle_action(hub: SharedHub, msg: ClientMessage, delay: Duration) -> Result<()> {
    if !delay.is_zero() {
        time::sleep(delay).await;
    }
    let kind = msg.kind();
    let mut h = hub.lock().await;
    let out = h.apply(msg);
    debug!(kind, frame = h.simulator().frame(), broadcast = out.is_some(), "action applied");
    match out {
        Some(out) => h.publish(&out),
        None => Ok(()),
    }
}

/// Drives the simulator at a fixed period until the task is dropped.
pub async fn run_ticker(hub: SharedHub, period: Duration) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_ms = period.as_millis(), "simulation ticker started");
    loop {
        interval.tick().await;
        let mut h = hub.lock().await;
        let Some(out) = h.tick() else {
            continue;
        };
        if let Err(err) = h.publish(&out) {
            warn!(?err, "failed to broadcast resync");
        }
    }
}
