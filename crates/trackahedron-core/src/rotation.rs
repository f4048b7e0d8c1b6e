//! Quaternion rotation model
//!
//! Converts yaw/pitch/roll triples into unit quaternions and ranks how close
//! two orientations are.

use serde::{Deserialize, Serialize};

use crate::vector::Vector;

/// Rotation represented as a quaternion `(w, x, y, z)`.
///
/// Built from Euler angles through the half-angle formula, which yields unit
/// norm for finite input. No renormalization is applied afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Scalar part
    pub w: f64,
    /// i component
    pub x: f64,
    /// j component
    pub y: f64,
    /// k component
    pub z: f64,
}

impl Rotation {
    /// The identity rotation
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    /// Create a rotation from raw quaternion components.
    #[inline]
    #[must_use]
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Build a rotation from Euler angles in radians.
    #[must_use]
    pub fn from_yaw_pitch_roll(pitch: f64, roll: f64, yaw: f64) -> Self {
        let (sy, cy) = libm::sincos(yaw * 0.5);
        let (sr, cr) = libm::sincos(roll * 0.5);
        let (sp, cp) = libm::sincos(pitch * 0.5);

        Self::new(
            cy * cr * cp + sy * sr * sp,
            cy * sr * cp - sy * cr * sp,
            cy * cr * sp + sy * sr * cp,
            sy * cr * cp - cy * sr * sp,
        )
    }

    /// Build a rotation from a vector of angles in radians.
    ///
    /// Axis mapping: `y` drives pitch, `z` drives roll and `x` drives yaw.
    /// The reference table was captured with this mapping, so it must not
    /// be changed independently of the table.
    #[must_use]
    pub fn from_vector(v: Vector) -> Self {
        Self::from_yaw_pitch_roll(v.y, v.z, v.x)
    }

    /// 4-component dot product.
    #[inline]
    pub fn inner_product(&self, other: &Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Closeness metric `1 - (a·b)²`.
    ///
    /// 0 for identical orientations (including `q` vs `-q`), 1 for maximally
    /// different ones. Monotonic in angular separation but not a true
    /// metric, so only use it for ranking.
    #[inline]
    pub fn distance(&self, other: &Self) -> f64 {
        let p = self.inner_product(other);
        1.0 - p * p
    }

    /// Angular separation in radians, `acos(2p² - 1)`.
    ///
    /// The argument is clamped to `[-1, 1]` so rounding on near-identical
    /// rotations cannot produce NaN.
    pub fn angle(&self, other: &Self) -> f64 {
        let p = self.inner_product(other);
        libm::acos((2.0 * p * p - 1.0).clamp(-1.0, 1.0))
    }

    /// Euclidean norm of the quaternion.
    pub fn norm(&self) -> f64 {
        libm::sqrt(self.inner_product(self))
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}
