// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-slot collection of cubes advanced by a global tick.
//!
//! Every action here is a deterministic function of the current state and
//! the action's arguments (tap point, thrown ids, seed). Replicas that apply
//! the same actions to the same snapshot end in the same state without the
//! random outcomes ever crossing the wire.

use std::f64::consts::PI;

use crate::cube::{Cube, Walls};
use crate::math::{random_direction, seeded_unit, Mat3, Vec3};
use crate::snapshot::{CubeState, Point2, SimulatorState, StateError};

/// Fixed timestep used by [`Simulator::update`].
pub const DT: f64 = 0.1;

/// Horizontal radius within which a tap affects a cube.
pub const TAP_RADIUS: f64 = 4.0;

/// Impulse magnitude of a tap directly below a cube.
pub const TAP_POWER: f64 = 4.0;

const TAP_FALLOFF: f64 = 4.0;
const TAP_KICK: f64 = 0.1;
const TAP_SPIN_SEED_OFFSET: f64 = 10.0;

const THROW_HEIGHT: f64 = 8.0;
const THROW_HEIGHT_JITTER: f64 = 2.0;
const THROW_SPREAD: f64 = 2.0;
const THROW_SPIN: f64 = 4.0;
const THROW_SEED_STRIDE: f64 = 100.0;

/// Authoritative (or replica) dice simulation.
#[derive(Debug, Clone)]
pub struct Simulator {
    cubes: Vec<Cube>,
    frame: u64,
    walls: Option<Walls>,
    stopped: bool,
}

impl Simulator {
    /// Creates `count` cubes stacked in a column above the origin, the
    /// lowest at `z = 6` and each next one 3 units higher.
    pub fn new(count: usize, walls: Option<Walls>) -> Self {
        let cubes = (0..count)
            .map(|i| Cube::new(Vec3::new(0.0, 0.0, 6.0 + 3.0 * (count - 1 - i) as f64)))
            .collect();
        Self::from_cubes(cubes, walls)
    }

    /// Creates a simulator from explicit cubes; the slot count is fixed from
    /// here on.
    pub fn from_cubes(cubes: Vec<Cube>, walls: Option<Walls>) -> Self {
        Self {
            cubes,
            frame: 0,
            walls,
            stopped: false,
        }
    }

    /// Frames advanced so far (including frames skipped while stopped).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// True when no cube moved during the last tick.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// All slots, hidden ones included.
    pub fn cubes(&self) -> &[Cube] {
        &self.cubes
    }

    /// Cube in slot `index`, if the slot exists.
    pub fn cube(&self, index: usize) -> Option<&Cube> {
        self.cubes.get(index)
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    /// True when the simulator owns no slots.
    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    /// Floor bounds, if any.
    pub fn walls(&self) -> Option<Walls> {
        self.walls
    }

    /// Advances the world by one tick.
    ///
    /// While stopped only the frame counter moves. Otherwise every unordered
    /// pair of visible cubes is collided (in index order), then every visible
    /// cube is integrated; the simulator stops when none of them moved.
    pub fn update(&mut self) {
        self.frame += 1;
        if self.stopped {
            return;
        }
        for i in 0..self.cubes.len() {
            let (head, tail) = self.cubes.split_at_mut(i + 1);
            let a = &mut head[i];
            if a.hidden {
                continue;
            }
            for b in tail.iter_mut().filter(|b| !b.hidden) {
                Cube::hit(a, b);
            }
        }
        let walls = self.walls;
        let mut moving = false;
        for cube in self.cubes.iter_mut().filter(|c| !c.hidden) {
            moving |= cube.update(DT, walls);
        }
        self.stopped = !moving;
    }

    fn horizontal_distance(cube: &Cube, point: Point2) -> f64 {
        (cube.position.x() - point.x).hypot(cube.position.y() - point.y)
    }

    /// True when a visible cube lies within [`TAP_RADIUS`] of `point`.
    pub fn has_tap_target_cube(&self, point: Point2) -> bool {
        self.cubes
            .iter()
            .filter(|c| !c.hidden)
            .any(|c| Self::horizontal_distance(c, point) < TAP_RADIUS)
    }

    /// Pushes every visible cube near `point` up and away from it.
    ///
    /// The impulse is `TAP_POWER * exp(-d²/4)` along `(dx/4, dy/4, dz)`, plus
    /// a small horizontal kick and a spin kick, both seeded from the tap
    /// point and the cube's distance `d`.
    pub fn tap_position(&mut self, point: Point2) {
        self.stopped = false;
        let origin = Vec3::new(point.x, point.y, 0.0);
        for cube in self.cubes.iter_mut().filter(|c| !c.hidden) {
            let distance = Self::horizontal_distance(cube, point);
            if distance >= TAP_RADIUS {
                continue;
            }
            let diff = cube.position.sub(&origin);
            let dir = match Vec3::new(diff.x() / TAP_FALLOFF, diff.y() / TAP_FALLOFF, diff.z())
                .normalize()
            {
                d if d == Vec3::ZERO => Vec3::UNIT_Z,
                d => d,
            };
            let power = TAP_POWER * (-distance * distance / TAP_FALLOFF).exp();
            let seed = point.x + 2.0 * point.y + distance;
            let kick = random_direction(TAP_KICK * power, Some(seed));
            cube.velocity = cube
                .velocity
                .add(&dir.scale(power))
                .add(&Vec3::new(kick.x(), kick.y(), 0.0));
            cube.momentum = cube
                .momentum
                .add(&random_direction(power, Some(seed + TAP_SPIN_SEED_OFFSET)));
        }
    }

    /// Hides the cubes in `ids`; unknown ids are ignored.
    pub fn hide(&mut self, ids: &[usize]) {
        for &id in ids {
            if let Some(cube) = self.cubes.get_mut(id) {
                cube.hidden = true;
            }
        }
        // Anything resting on a hidden cube has to fall.
        self.stopped = false;
    }

    /// Reveals the cubes in `ids` and drops them from a seeded position.
    ///
    /// The resulting position, orientation and spin depend only on `seed` and
    /// the slot index, so every replica computes the same throw.
    pub fn throw(&mut self, ids: &[usize], seed: f64) {
        let (spread_x, spread_y) = match self.walls {
            Some(w) => (
                THROW_SPREAD.min(w.x - 1.0).max(0.0),
                THROW_SPREAD.min(w.y - 1.0).max(0.0),
            ),
            None => (THROW_SPREAD, THROW_SPREAD),
        };
        for &id in ids {
            let Some(cube) = self.cubes.get_mut(id) else {
                continue;
            };
            let s = seed + THROW_SEED_STRIDE * id as f64;
            cube.position = Vec3::new(
                (2.0 * seeded_unit(s + 1.0) - 1.0) * spread_x,
                (2.0 * seeded_unit(s + 2.0) - 1.0) * spread_y,
                THROW_HEIGHT + THROW_HEIGHT_JITTER * seeded_unit(s + 3.0),
            );
            cube.velocity = Vec3::ZERO;
            cube.momentum = random_direction(THROW_SPIN, Some(s + 10.0));
            cube.rotation = Mat3::from_rotation(
                random_direction(1.0, Some(s + 20.0)),
                Some(2.0 * PI * seeded_unit(s + 30.0)),
            );
            cube.hidden = false;
        }
        self.stopped = false;
    }

    /// Exports the full state; hidden slots become `None`.
    pub fn current_state(&self) -> SimulatorState {
        SimulatorState {
            frame: self.frame,
            cubes: self
                .cubes
                .iter()
                .map(|c| (!c.hidden).then(|| CubeState::from(c)))
                .collect(),
        }
    }

    /// Replaces every slot with the snapshot's state.
    ///
    /// `None` entries become hidden cubes at the origin. The snapshot must
    /// carry exactly one entry per slot and only finite numbers; otherwise
    /// the simulator is left untouched.
    pub fn replace_state(&mut self, state: &SimulatorState) -> Result<(), StateError> {
        if state.cubes.len() != self.cubes.len() {
            return Err(StateError::SlotCountMismatch {
                expected: self.cubes.len(),
                got: state.cubes.len(),
            });
        }
        let cubes = state
            .cubes
            .iter()
            .enumerate()
            .map(|(index, slot)| match slot {
                Some(cs) => cs.to_cube().ok_or(StateError::NonFinite { index }),
                None => Ok(Cube::hidden_at_origin()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.cubes = cubes;
        self.frame = state.frame;
        self.stopped = false;
        Ok(())
    }
}
