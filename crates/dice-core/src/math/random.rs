// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Random unit directions, either nondeterministic or derived from a seed.
//!
//! The seeded variant is a pure function of its input so that two replicas
//! holding the same seed (or the same pre-collision state the seed is derived
//! from) compute the same "random" kick without transmitting it.

use std::f64::consts::PI;

use crate::math::Vec3;

/// Maps a seed to a pseudo-random value in `[0, 1)`.
///
/// The remainder keeps the sign of the dividend, so the pre-offset value lies
/// in `(-0.5, 0.5)`. Viewer replicas evaluate the same expression. The `* 1000`
/// amplifies last-ulp differences in `cos`, so results agree with a browser
/// to about 1e-12, not bit for bit.
pub fn seeded_unit(seed: f64) -> f64 {
    (seed * 1000.0).cos() * 1000.0 % 0.5 + 0.5
}

/// Returns a direction of length `length`, uniformly distributed on the
/// sphere.
///
/// With `Some(seed)` the result depends only on `seed`; with `None` it draws
/// from the thread-local RNG.
///
/// # Examples
/// ```
/// use dice_core::math::random_direction;
/// let a = random_direction(2.0, Some(5.0));
/// let b = random_direction(2.0, Some(5.0));
/// assert_eq!(a, b);
/// assert!((a.length() - 2.0).abs() < 1e-9);
/// ```
pub fn random_direction(length: f64, seed: Option<f64>) -> Vec3 {
    let (rand1, rand2) = match seed {
        Some(seed) => (seeded_unit(seed + 1.0), seeded_unit(seed + 2.0)),
        None => (rand::random::<f64>(), rand::random::<f64>()),
    };
    let z = 2.0 * rand1 - 1.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let theta = 2.0 * PI * rand2;
    Vec3::new(
        length * r * theta.cos(),
        length * r * theta.sin(),
        length * z,
    )
}
