// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-cube presentation data relayed verbatim between viewers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One slot: `None`, or an opaque list the hub never interprets.
pub type AppearanceSlot = Option<Vec<Value>>;

/// Fixed-size table with one [`AppearanceSlot`] per cube.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppearanceTable {
    slots: Vec<AppearanceSlot>,
}

impl AppearanceTable {
    /// Table of `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Overwrites slot `id`; returns `false` (and changes nothing) when the
    /// id is out of range.
    pub fn set(&mut self, id: i64, data: AppearanceSlot) -> bool {
        let Some(slot) = usize::try_from(id).ok().and_then(|i| self.slots.get_mut(i)) else {
            return false;
        };
        *slot = data;
        true
    }

    /// Slot `id`, if in range.
    pub fn get(&self, id: usize) -> Option<&AppearanceSlot> {
        self.slots.get(id)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the table has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
