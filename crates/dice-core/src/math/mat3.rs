// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vec3;

/// Row-major 3×3 rotation matrix.
///
/// - Elements are stored row by row; the layout is part of the snapshot wire
///   format (`r: [9 numbers]`), so it must not change.
/// - Instances built by [`Mat3::from_rotation`] are orthonormal; products of
///   rotations drift slowly with rounding and are not re-orthonormalised.
///
/// # Examples
/// ```
/// use core::f64::consts::FRAC_PI_2;
/// use dice_core::math::{Mat3, Vec3};
/// // Quarter turn about +Z maps +X onto +Y.
/// let r = Mat3::from_rotation(Vec3::UNIT_Z, Some(FRAC_PI_2));
/// let v = r.transform(&Vec3::UNIT_X);
/// assert!((v.y() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat3 {
    data: [f64; 9],
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat3 {
    /// Returns the identity matrix.
    pub const fn identity() -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, // row 0
                0.0, 1.0, 0.0, // row 1
                0.0, 0.0, 1.0, // row 2
            ],
        }
    }

    /// Creates a matrix from row-major element data.
    pub const fn new(data: [f64; 9]) -> Self {
        Self { data }
    }

    /// Returns the row-major elements.
    pub fn elements(&self) -> [f64; 9] {
        self.data
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        self.data[3 * row + col]
    }

    /// Builds a rotation via Rodrigues' formula.
    ///
    /// With `angle == None` the axis length is used as the angle, which lets
    /// a spin vector act directly as a rotation generator. An effective angle
    /// of exactly zero, or a zero-length axis, yields the identity.
    pub fn from_rotation(axis: Vec3, angle: Option<f64>) -> Self {
        let r = axis.length();
        let theta = angle.unwrap_or(r);
        if theta == 0.0 || r == 0.0 {
            return Self::identity();
        }
        let (sin, cos) = theta.sin_cos();
        let nx = axis.x() / r;
        let ny = axis.y() / r;
        let nz = axis.z() / r;
        let cc = 1.0 - cos;
        let xy = nx * ny * cc;
        let yz = ny * nz * cc;
        let zx = nz * nx * cc;
        Self::new([
            nx * nx * cc + cos, xy - nz * sin,      zx + ny * sin,
            xy + nz * sin,      ny * ny * cc + cos, yz - nx * sin,
            zx - ny * sin,      yz + nx * sin,      nz * nz * cc + cos,
        ])
    }

    /// Multiplies the matrix with another matrix (`self * rhs`).
    ///
    /// Applied to a vector, the product rotates by `rhs` first and `self`
    /// second, so `increment.multiply(&current)` applies `increment` in the
    /// world frame.
    pub fn multiply(&self, rhs: &Self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += self.at(row, k) * rhs.at(k, col);
                }
                out[3 * row + col] = sum;
            }
        }
        Self::new(out)
    }

    /// Element-wise sum.
    pub fn add(&self, rhs: &Self) -> Self {
        let mut out = self.data;
        for (o, r) in out.iter_mut().zip(rhs.data.iter()) {
            *o += r;
        }
        Self::new(out)
    }

    /// Returns the transpose (the inverse, for a pure rotation).
    pub fn transpose(&self) -> Self {
        let mut out = [0.0; 9];
        for row in 0..3 {
            for col in 0..3 {
                out[3 * col + row] = self.at(row, col);
            }
        }
        Self::new(out)
    }

    /// Applies the matrix to a column vector.
    pub fn transform(&self, v: &Vec3) -> Vec3 {
        let (x, y, z) = (v.x(), v.y(), v.z());
        Vec3::new(
            x * self.at(0, 0) + y * self.at(0, 1) + z * self.at(0, 2),
            x * self.at(1, 0) + y * self.at(1, 1) + z * self.at(1, 2),
            x * self.at(2, 0) + y * self.at(2, 1) + z * self.at(2, 2),
        )
    }

    /// Returns true when every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|e| e.is_finite())
    }
}

impl From<[f64; 9]> for Mat3 {
    fn from(value: [f64; 9]) -> Self {
        Self { data: value }
    }
}

impl core::ops::Mul for Mat3 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        self.multiply(&rhs)
    }
}
