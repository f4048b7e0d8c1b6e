//! 3-component vector value type
//!
//! Samples and reference faces are both carried as [`Vector`]. All operations
//! return new values; nothing here mutates in place.

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Immutable triple of real numbers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vector {
    /// The zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector from components.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer components (face table literals).
    #[inline]
    #[must_use]
    pub const fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(x as f64, y as f64, z as f64)
    }

    /// Remap each axis from `[min, max]` to `[-1, 1]`, clamping the result.
    ///
    /// A zero-width range on any axis divides by zero; [`crate::ScaleBounds`]
    /// rejects such bounds when it is constructed.
    #[must_use]
    pub fn scale_to_range(self, min: Self, max: Self) -> Self {
        Self::new(
            remap_axis(self.x, min.x, max.x),
            remap_axis(self.y, min.y, max.y),
            remap_axis(self.z, min.z, max.z),
        )
    }

    /// Multiply every component by `s`.
    #[inline]
    #[must_use]
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Convert components from degrees to radians.
    #[inline]
    #[must_use]
    pub fn to_radians(self) -> Self {
        self.scale(core::f64::consts::PI / 180.0)
    }

    /// Component-wise sum.
    #[inline]
    #[must_use]
    pub fn add(self, v: Self) -> Self {
        Self::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }

    /// Component-wise difference.
    #[inline]
    #[must_use]
    pub fn subtract(self, v: Self) -> Self {
        Self::new(self.x - v.x, self.y - v.y, self.z - v.z)
    }

    /// Component-wise product.
    #[inline]
    #[must_use]
    pub fn multiply(self, v: Self) -> Self {
        Self::new(self.x * v.x, self.y * v.y, self.z * v.z)
    }

    /// Whether every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[inline]
fn remap_axis(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min) * 2.0 - 1.0).clamp(-1.0, 1.0)
}

impl Add for Vector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Vector::add(self, rhs)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIN: Vector = Vector::from_ints(-505, -521, -620);
    const MAX: Vector = Vector::from_ints(549, 506, 476);

    #[test]
    fn test_scale_to_range_endpoints() {
        let lo = MIN.scale_to_range(MIN, MAX);
        let hi = MAX.scale_to_range(MIN, MAX);
        assert_eq!(lo, Vector::new(-1.0, -1.0, -1.0));
        assert_eq!(hi, Vector::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_scale_to_range_midpoint() {
        let mid = MIN.add(MAX).scale(0.5);
        let scaled = mid.scale_to_range(MIN, MAX);
        assert!(scaled.x.abs() < 1e-12);
        assert!(scaled.y.abs() < 1e-12);
        assert!(scaled.z.abs() < 1e-12);
    }

    #[test]
    fn test_scale_to_range_clamps() {
        let far = Vector::new(5000.0, -5000.0, 1e9);
        assert_eq!(far.scale_to_range(MIN, MAX), Vector::new(1.0, -1.0, 1.0));
    }

    #[test]
    fn test_zero_vector_scaling() {
        // (0 - min) / (max - min) * 2 - 1, per axis
        let scaled = Vector::ZERO.scale_to_range(MIN, MAX);
        assert!((scaled.x - (-0.041_745_730_550_284_6)).abs() < 1e-12);
        assert!((scaled.y - 0.014_605_647_517_039_97).abs() < 1e-12);
        assert!((scaled.z - 0.131_386_861_313_868_67).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let a = Vector::new(1.0, 2.0, 3.0);
        let b = Vector::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vector::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vector::new(3.0, 3.0, 3.0));
        assert_eq!(a.multiply(b), Vector::new(4.0, 10.0, 18.0));
        assert_eq!(a * 2.0, Vector::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_to_radians() {
        let v = Vector::new(180.0, 90.0, 0.0).to_radians();
        assert!((v.x - core::f64::consts::PI).abs() < 1e-12);
        assert!((v.y - core::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(v.z, 0.0);
    }

    proptest! {
        #[test]
        fn prop_scale_to_range_is_clamped(
            x in -1e12f64..1e12,
            y in -1e12f64..1e12,
            z in -1e12f64..1e12,
        ) {
            let s = Vector::new(x, y, z).scale_to_range(MIN, MAX);
            for c in [s.x, s.y, s.z] {
                prop_assert!((-1.0..=1.0).contains(&c));
            }
        }
    }
}
