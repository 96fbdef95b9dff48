// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session wire schema for the dice hub.
//!
//! Frames are JSON text, internally tagged by `"type"`. Viewers send
//! [`ClientMessage`] actions; the hub answers with [`ServerMessage`]
//! snapshots and appearance updates. Snapshot payloads reuse
//! [`dice_core::SimulatorState`] so the wire shape and the simulator's
//! export format cannot drift apart.

mod appearance;
pub mod wire;

pub use appearance::{AppearanceSlot, AppearanceTable};
pub use dice_core::{CubeState, Point2, Point3, SimulatorState};
pub use wire::{
    decode_client, decode_client_lenient, decode_server, encode_client, encode_server, WireError,
};

use serde::{Deserialize, Serialize};

/// Default WebSocket route served by the hub.
pub const WS_PATH: &str = "/ws";

/// Opaque per-viewer identifier used to match echoes with local predictions.
pub type ClientId = String;

/// Viewer → hub action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Push nearby cubes away from a floor point.
    Tap {
        /// Floor point that was tapped.
        position: Point2,
        /// Sender's id, echoed back with the resulting snapshot.
        #[serde(
            rename = "clientId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        client_id: Option<ClientId>,
    },
    /// Hide the listed cube slots.
    Hide {
        /// Slot indices; unknown ones are ignored by the hub.
        ids: Vec<i64>,
    },
    /// Reveal and drop the listed cube slots from seeded positions.
    Throw {
        /// Slot indices; unknown ones are ignored by the hub.
        ids: Vec<i64>,
        /// Seed shared by every replica applying this throw.
        seed: f64,
    },
    /// Replace one entry of the appearance table.
    Update {
        /// Slot index.
        id: i64,
        /// New appearance, or `null` to clear it.
        data: AppearanceSlot,
    },
    /// Any tag this build does not know; handled as a no-op.
    #[serde(other)]
    Unrecognized,
}

impl ClientMessage {
    /// Stable label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tap { .. } => "tap",
            Self::Hide { .. } => "hide",
            Self::Throw { .. } => "throw",
            Self::Update { .. } => "update",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Hub → viewer frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// First frame on a new connection.
    Init {
        /// Authoritative snapshot.
        state: SimulatorState,
        /// Current appearance table.
        appearance: AppearanceTable,
    },
    /// Snapshot after an action (or a periodic resync when `client_id` is
    /// `None`).
    Cubes {
        /// Authoritative snapshot.
        state: SimulatorState,
        /// Viewer whose action produced this snapshot.
        #[serde(rename = "clientId", default)]
        client_id: Option<ClientId>,
    },
    /// Appearance table after an `update` action.
    Appearance {
        /// Current appearance table.
        appearance: AppearanceTable,
    },
}

/// Converts wire slot ids to simulator indices, dropping negative ones.
pub fn slot_indices(ids: &[i64]) -> Vec<usize> {
    ids.iter().filter_map(|&id| usize::try_from(id).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_dropped() {
        assert_eq!(slot_indices(&[-1, 0, 3]), vec![0, 3]);
    }

    #[test]
    fn kind_labels_match_tags() {
        let msg = ClientMessage::Hide { ids: vec![] };
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], msg.kind());
    }
}
