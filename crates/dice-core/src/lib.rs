// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! dice-core: deterministic rigid-cube ("dice") simulation.
//!
//! The crate owns the physics-and-state engine: per-step integration of each
//! cube, floor contact with friction impulses, pairwise collision, and the
//! snapshot export/import used to keep remote replicas in lockstep. Transport,
//! rendering and process bootstrap live in other crates.

pub mod math;

mod cube;
mod simulator;
mod snapshot;

pub use cube::{Cube, Walls, FRICTION, GRAVITY};
pub use simulator::{Simulator, DT, TAP_POWER, TAP_RADIUS};
pub use snapshot::{CubeState, Point2, Point3, SimulatorState, StateError};
