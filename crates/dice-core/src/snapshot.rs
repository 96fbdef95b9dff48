// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serializable simulator state exchanged between the authority and viewers.
//!
//! The JSON shape is a compatibility contract:
//! `{frame, cubes: [{p:{x,y,z}, v:{x,y,z}, r:[9 numbers], m:{x,y,z}} | null]}`
//! with field order as declared here and `null` marking a hidden cube.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cube::Cube;
use crate::math::{Mat3, Vec3};

/// Point on the floor plane.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// Wire form of a 3D vector.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x(),
            y: v.y(),
            z: v.z(),
        }
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

/// State of one visible cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeState {
    /// Position.
    pub p: Point3,
    /// Linear velocity.
    pub v: Point3,
    /// Row-major rotation elements.
    pub r: [f64; 9],
    /// Spin vector.
    pub m: Point3,
}

impl CubeState {
    fn numbers(&self) -> impl Iterator<Item = f64> + '_ {
        [self.p, self.v, self.m]
            .into_iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .chain(self.r.iter().copied())
    }

    /// Largest absolute component-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        self.numbers()
            .zip(other.numbers())
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()))
    }

    /// Rebuilds a visible cube; `None` when any number is non-finite.
    pub(crate) fn to_cube(&self) -> Option<Cube> {
        if !self.numbers().all(f64::is_finite) {
            return None;
        }
        Some(Cube::from_parts(
            self.p.into(),
            self.v.into(),
            Mat3::from(self.r),
            self.m.into(),
        ))
    }
}

impl From<&Cube> for CubeState {
    fn from(cube: &Cube) -> Self {
        Self {
            p: cube.position().into(),
            v: cube.velocity().into(),
            r: cube.rotation().elements(),
            m: cube.momentum().into(),
        }
    }
}

/// Full simulator snapshot: frame counter plus one slot per cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorState {
    /// Frame counter at capture time.
    pub frame: u64,
    /// Per-slot state; `None` marks a hidden cube.
    pub cubes: Vec<Option<CubeState>>,
}

impl SimulatorState {
    /// Largest absolute difference between two snapshots.
    ///
    /// Returns `None` when the snapshots are not comparable: different slot
    /// counts, or a slot visible in one and hidden in the other.
    pub fn max_abs_diff(&self, other: &Self) -> Option<f64> {
        if self.cubes.len() != other.cubes.len() {
            return None;
        }
        let mut worst = 0.0_f64;
        for (a, b) in self.cubes.iter().zip(&other.cubes) {
            match (a, b) {
                (Some(a), Some(b)) => worst = worst.max(a.max_abs_diff(b)),
                (None, None) => {}
                _ => return None,
            }
        }
        Some(worst)
    }
}

/// Reasons a snapshot cannot be imported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The snapshot does not have one entry per slot.
    #[error("snapshot has {got} cube slots, simulator has {expected}")]
    SlotCountMismatch {
        /// Slots owned by the simulator.
        expected: usize,
        /// Slots present in the snapshot.
        got: usize,
    },
    /// A cube entry contains NaN or infinite numbers.
    #[error("cube {index} has non-finite state")]
    NonFinite {
        /// Offending slot.
        index: usize,
    },
}
