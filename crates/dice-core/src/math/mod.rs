// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Math helpers for the dice simulation: 3D vectors, 3×3 rotation matrices
//! and the seeded direction generator.
//!
//! Everything is `f64` to match viewer replicas running IEEE doubles. Basic
//! arithmetic agrees exactly; `cos`, `sin` and `sqrt`-based lengths may
//! differ from a browser's libm in the last ulp, so replicas agree within a
//! small tolerance and hub snapshots correct the drift.

mod mat3;
mod random;
mod vec3;

pub use mat3::Mat3;
pub use random::{random_direction, seeded_unit};
pub use vec3::Vec3;

/// Degeneracy threshold used when normalising vectors.
pub const EPSILON: f64 = 1e-12;

/// Clamps `value` to the inclusive `[min, max]` range.
///
/// NaN inputs collapse to `min`, so callers feeding the result back into
/// state never propagate NaN.
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    debug_assert!(min <= max, "invalid clamp range: {min} > {max}");
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_and_nan() {
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.25, 0.0, 1.0), 0.25);
        assert_eq!(clamp(7.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(f64::NAN, 0.0, 1.0), 0.0);
    }
}
