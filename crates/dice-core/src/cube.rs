// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single rigid cube: integration, floor contact and pairwise collision.
//!
//! `momentum` is used directly as an angular-velocity vector (no inertia
//! tensor). Viewer replicas run the same model; hub snapshots absorb the
//! small floating-point drift between platforms.

use std::f64::consts::PI;

use crate::math::{clamp, random_direction, Mat3, Vec3};

/// Gravity applied every step (one unit of acceleration, straight down).
pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Ratio of tangential friction force to normal force at a floor contact.
pub const FRICTION: f64 = 0.5;

const FLOOR_Z: f64 = 0.0;
const FLOOR_FRICTION_STEP: f64 = 0.001;
const REST_EPSILON: f64 = 0.001;
const FACE_DOWN_COS: f64 = 0.999;
const REST_HEIGHT_FACTOR: f64 = 1.1;
const IMPULSE_TIME_FACTOR: f64 = 1.5;

/// Unit-cube vertices in fixed enumeration order: bit 0 selects x, bit 1
/// selects y, bit 2 selects z (0 → -1, 1 → +1). Contact resolution visits
/// corners in this order and the result depends on it.
const CORNERS: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
];

const FACES: [Vec3; 6] = [
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, -1.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(0.0, 0.0, 1.0),
];

const AXES: [Vec3; 3] = [Vec3::UNIT_X, Vec3::UNIT_Y, Vec3::UNIT_Z];

/// Half-extents of the floor region (`|x| ≤ x`, `|y| ≤ y`).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Walls {
    /// Half-width along X.
    pub x: f64,
    /// Half-depth along Y.
    pub y: f64,
}

/// One die.
///
/// Identity is the slot index inside the owning [`crate::Simulator`]; a cube
/// is never destroyed, only hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    pub(crate) position: Vec3,
    pub(crate) velocity: Vec3,
    pub(crate) rotation: Mat3,
    pub(crate) momentum: Vec3,
    pub(crate) size: f64,
    pub(crate) hidden: bool,
}

impl Cube {
    /// Creates a visible cube at `position` with a random orientation, a
    /// random spin of magnitude 4 and no linear velocity.
    pub fn new(position: Vec3) -> Self {
        let rotation = Mat3::from_rotation(
            random_direction(1.0, None),
            Some(2.0 * PI * rand::random::<f64>()),
        );
        Self::from_parts(position, Vec3::ZERO, rotation, random_direction(4.0, None))
    }

    /// Creates a visible unit cube from explicit state.
    pub fn from_parts(position: Vec3, velocity: Vec3, rotation: Mat3, momentum: Vec3) -> Self {
        Self {
            position,
            velocity,
            rotation,
            momentum,
            size: 1.0,
            hidden: false,
        }
    }

    /// Hidden placeholder: origin, identity rotation, no motion.
    pub fn hidden_at_origin() -> Self {
        Self {
            hidden: true,
            ..Self::from_parts(Vec3::ZERO, Vec3::ZERO, Mat3::identity(), Vec3::ZERO)
        }
    }

    /// Centre of the cube.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Linear velocity.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Orientation.
    pub fn rotation(&self) -> Mat3 {
        self.rotation
    }

    /// Spin vector: direction is the axis, magnitude the angular speed.
    pub fn momentum(&self) -> Vec3 {
        self.momentum
    }

    /// Half-edge length.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Hidden cubes take no part in physics, collision or taps.
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// `|v|²/2 + |m|²/2`, the quantity floor contact may only dissipate.
    pub fn kinetic_energy(&self) -> f64 {
        (self.velocity.length_squared() + self.momentum.length_squared()) / 2.0
    }

    fn corner_offset(&self, corner: &Vec3) -> Vec3 {
        self.rotation.transform(corner).scale(self.size)
    }

    /// World-space corners in the fixed enumeration order.
    pub fn corners(&self) -> [Vec3; 8] {
        CORNERS.map(|c| self.position.add(&self.corner_offset(&c)))
    }

    /// True when one face normal points (almost) straight down.
    pub fn is_face_down(&self) -> bool {
        FACES
            .iter()
            .any(|n| self.rotation.transform(n).z() < -FACE_DOWN_COS)
    }

    fn is_resting(&self) -> bool {
        self.is_face_down()
            && self.position.z() < self.size * REST_HEIGHT_FACTOR
            && self.velocity.length() + self.momentum.length() < REST_EPSILON
    }

    /// Advances the cube by one step of length `dt`.
    ///
    /// Returns `false` when the cube is lying still on a face and the step
    /// was skipped; the simulator stops once every cube reports `false`.
    pub fn update(&mut self, dt: f64, walls: Option<Walls>) -> bool {
        if self.is_resting() {
            return false;
        }
        self.velocity = self.velocity.add(&GRAVITY.scale(dt));
        self.position = self.position.add(&self.velocity.scale(dt));
        let spin = Mat3::from_rotation(self.momentum, Some(self.momentum.length() * dt));
        self.rotation = spin.multiply(&self.rotation);
        self.hit_floor();
        if let Some(walls) = walls {
            self.hit_walls(walls);
        }
        true
    }

    /// Resolves floor penetration corner by corner.
    ///
    /// Each penetrating corner lifts the cube out of the floor, dissipates
    /// the lift's potential energy (linear first, the remainder from spin)
    /// when lying on a face, then applies a normal-plus-friction impulse at
    /// the corner. Corners are processed sequentially and later corners see
    /// the state left by earlier ones.
    pub(crate) fn hit_floor(&mut self) {
        let face_down = self.is_face_down();
        for corner in &CORNERS {
            let rpos = self.corner_offset(corner);
            let point = self.position.add(&rpos);
            if point.z() > FLOOR_Z {
                continue;
            }
            let h = FLOOR_Z - point.z();
            self.position.set_z(self.position.z() + h);
            if face_down {
                self.dissipate(h);
            }
            self.apply_contact_impulse(&rpos);
        }
    }

    fn dissipate(&mut self, h: f64) {
        self.velocity = self.velocity.shorten(FLOOR_FRICTION_STEP);
        self.momentum = self.momentum.shorten(FLOOR_FRICTION_STEP);
        let v_energy = self.velocity.length_squared() / 2.0;
        let loss = -GRAVITY.z() * h;
        let vscale = (1.0 - 2.0 * loss / self.velocity.length_squared())
            .max(0.0)
            .sqrt();
        if vscale < 1.0 {
            self.velocity = self.velocity.scale(vscale);
        }
        let spin_loss = loss - (v_energy - self.velocity.length_squared() / 2.0);
        let mscale = (1.0 - 2.0 * spin_loss / self.momentum.length_squared())
            .max(0.0)
            .sqrt();
        if mscale < 1.0 {
            self.momentum = self.momentum.scale(mscale);
        }
    }

    fn apply_contact_impulse(&mut self, rpos: &Vec3) {
        let vel = self.velocity.add(&self.momentum.cross(rpos));
        if vel.z() > 0.0 {
            return;
        }
        let rxy = match vel.x().hypot(vel.y()) {
            r if r == 0.0 || r.is_nan() => 1.0,
            r => r,
        };
        let fz = Vec3::new(0.0, 0.0, -vel.z());
        let fxy = Vec3::new(
            FRICTION * vel.z() * vel.x() / rxy,
            FRICTION * vel.z() * vel.y() / rxy,
            0.0,
        );
        // Contact velocity evolves as vel + v1 * t under the normal force.
        let v1 = fz.add(&rpos.cross(&fz).cross(rpos));
        let t = -IMPULSE_TIME_FACTOR * vel.z() / v1.z();
        if t.is_nan() || t <= 0.0 {
            return;
        }
        let a = self.velocity.add(&fz.scale(t));
        let af = fxy.scale(t);
        let b = self.momentum.add(&rpos.cross(&fz).scale(t));
        let bf = rpos.cross(&fxy).scale(t);
        let denom = af.dot(&af) + bf.dot(&bf);
        // Without a friction force the fraction is irrelevant.
        let f = if denom == 0.0 {
            0.0
        } else {
            clamp(-(a.dot(&af) + b.dot(&bf)) / denom, 0.0, 1.0)
        };
        let force = fz.add(&fxy.scale(f));
        self.velocity = self.velocity.add(&force.scale(t));
        self.momentum = self.momentum.add(&rpos.cross(&force).scale(t));
    }

    fn hit_walls(&mut self, walls: Walls) {
        let offsets = CORNERS.map(|c| self.corner_offset(&c));
        let extent_x = offsets.iter().fold(0.0_f64, |m, o| m.max(o.x().abs()));
        let extent_y = offsets.iter().fold(0.0_f64, |m, o| m.max(o.y().abs()));
        let (px, vx) = bound_axis(
            self.position.x(),
            self.velocity.x(),
            (walls.x - extent_x).max(0.0),
        );
        let (py, vy) = bound_axis(
            self.position.y(),
            self.velocity.y(),
            (walls.y - extent_y).max(0.0),
        );
        self.position = Vec3::new(px, py, self.position.z());
        self.velocity = Vec3::new(vx, vy, self.velocity.z());
    }

    /// Approximate separating-axis overlap test.
    ///
    /// Only the three face normals of each cube are tried as axes (no
    /// edge-edge cross products), so some near-miss edge configurations are
    /// reported as overlapping. Hidden state is not consulted.
    pub fn hit_test(a: &Self, b: &Self) -> bool {
        for (a, b) in [(a, b), (b, a)] {
            let offset = b.position.sub(&a.position);
            let coords = CORNERS.map(|c| b.corner_offset(&c).add(&offset));
            for axis in &AXES {
                let f = a.rotation.transform(axis);
                if coords.iter().all(|c| a.size < f.dot(c))
                    || coords.iter().all(|c| f.dot(c) < -a.size)
                {
                    return false;
                }
            }
        }
        true
    }

    /// Resolves a collision between two overlapping, approaching cubes.
    ///
    /// The relative velocity along the centre line is reflected (equal and
    /// opposite impulses) and each cube gets a spin kick seeded from both
    /// positions, so every replica computes the same kick from the same
    /// pre-collision state. `hit(a, b)` and `hit(b, a)` are equivalent.
    pub fn hit(a: &mut Self, b: &mut Self) {
        if !Self::hit_test(a, b) {
            return;
        }
        let dir = a.position.sub(&b.position).normalize();
        if dir == Vec3::ZERO {
            return;
        }
        let dot = a.velocity.sub(&b.velocity).dot(&dir);
        if dot.is_nan() || dot >= 0.0 {
            return;
        }
        a.velocity = a.velocity.add(&dir.scale(-dot));
        b.velocity = b.velocity.add(&dir.scale(dot));
        let seed_a = a.position.x() + a.position.y() + a.position.z();
        let seed_b = b.position.x() + b.position.y() + b.position.z();
        a.momentum = a
            .momentum
            .add(&random_direction(1.0, Some(seed_a + 2.0 * seed_b)));
        b.momentum = b
            .momentum
            .add(&random_direction(1.0, Some(seed_a * 2.0 + seed_b)));
    }
}

fn bound_axis(pos: f64, vel: f64, limit: f64) -> (f64, f64) {
    if pos > limit {
        (limit, if vel > 0.0 { -vel } else { vel })
    } else if pos < -limit {
        (-limit, if vel < 0.0 { -vel } else { vel })
    } else {
        (pos, vel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resting(x: f64) -> Cube {
        Cube::from_parts(Vec3::new(x, 0.0, 1.0), Vec3::ZERO, Mat3::identity(), Vec3::ZERO)
    }

    #[test]
    fn corner_order_is_fixed() {
        let c = resting(0.0).corners();
        assert_eq!(c[0], Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(c[1], Vec3::new(1.0, -1.0, 0.0));
        assert_eq!(c[2], Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(c[7], Vec3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn face_down_detects_axis_aligned_orientation() {
        assert!(resting(0.0).is_face_down());
        let tilted = Cube::from_parts(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ZERO,
            Mat3::from_rotation(Vec3::UNIT_X, Some(0.3)),
            Vec3::ZERO,
        );
        assert!(!tilted.is_face_down());
    }

    #[test]
    fn wall_reflects_outward_velocity() {
        let mut cube = Cube::from_parts(
            Vec3::new(4.5, 0.0, 5.0),
            Vec3::new(2.0, 0.0, 0.0),
            Mat3::identity(),
            Vec3::ZERO,
        );
        cube.hit_walls(Walls { x: 5.0, y: 5.0 });
        assert_eq!(cube.position().x(), 4.0);
        assert_eq!(cube.velocity().x(), -2.0);
    }

    #[test]
    fn separated_cubes_do_not_hit() {
        assert!(!Cube::hit_test(&resting(0.0), &resting(2.5)));
        assert!(Cube::hit_test(&resting(0.0), &resting(1.5)));
    }

    #[test]
    fn coincident_centres_are_ignored() {
        let mut a = resting(0.0);
        let mut b = resting(0.0);
        a.velocity = Vec3::new(1.0, 0.0, 0.0);
        Cube::hit(&mut a, &mut b);
        assert_eq!(a.velocity(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(b.velocity(), Vec3::ZERO);
    }

    #[test]
    fn hidden_placeholder_is_still() {
        let cube = Cube::hidden_at_origin();
        assert!(cube.is_hidden());
        assert_eq!(cube.kinetic_energy(), 0.0);
        assert_eq!(cube.rotation(), Mat3::identity());
    }

    fn rotation_strategy() -> impl Strategy<Value = Mat3> {
        prop_oneof![
            Just(Mat3::identity()),
            (prop::array::uniform3(-1.0..1.0f64), 0.0..(2.0 * PI))
                .prop_map(|(axis, angle)| Mat3::from_rotation(Vec3::from(axis), Some(angle))),
        ]
    }

    proptest! {
        #[test]
        fn floor_contact_never_adds_energy(
            x in -1.0..1.0f64,
            y in -1.0..1.0f64,
            z in 0.3..1.7f64,
            v in prop::array::uniform3(-5.0..5.0f64),
            m in prop::array::uniform3(-5.0..5.0f64),
            rotation in rotation_strategy(),
        ) {
            let mut cube = Cube::from_parts(Vec3::new(x, y, z), Vec3::from(v), rotation, Vec3::from(m));
            let before = cube.kinetic_energy();
            cube.hit_floor();
            prop_assert!(cube.kinetic_energy() <= before + 1e-9);
        }

        #[test]
        fn hit_is_symmetric(
            dx in -1.8..1.8f64,
            va in prop::array::uniform3(-3.0..3.0f64),
            vb in prop::array::uniform3(-3.0..3.0f64),
        ) {
            let a = Cube::from_parts(Vec3::new(0.0, 0.0, 2.0), Vec3::from(va), Mat3::identity(), Vec3::ZERO);
            let b = Cube::from_parts(Vec3::new(dx, 0.5, 2.0), Vec3::from(vb), Mat3::identity(), Vec3::ZERO);
            let (mut a1, mut b1) = (a.clone(), b.clone());
            let (mut a2, mut b2) = (a, b);
            Cube::hit(&mut a1, &mut b1);
            Cube::hit(&mut b2, &mut a2);
            prop_assert_eq!(a1, a2);
            prop_assert_eq!(b1, b2);
        }
    }
}
