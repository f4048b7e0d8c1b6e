//! Reference orientations of the fixture
//!
//! The Trackahedron is a 12-faced fixture. Each face was captured once as a
//! raw sensor reading while resting on that face. Those readings are remapped
//! through the shared [`ScaleBounds`] and converted into rotations when the
//! [`ReferenceTable`] is built; live samples go through the exact same
//! transform before they are compared against the table.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Axis, ConfigError};
use crate::rotation::Rotation;
use crate::vector::Vector;

/// Number of faces on the fixture
pub const FACE_COUNT: usize = 12;

/// Raw sensor readings captured with the fixture resting on each face.
pub const DEFAULT_FACE_NORMALS: [Vector; FACE_COUNT] = [
    Vector::from_ints(74, 16, 443),
    Vector::from_ints(-105, -418, 196),
    Vector::from_ints(397, -273, 139),
    Vector::from_ints(415, 258, 106),
    Vector::from_ints(-81, 441, 143),
    Vector::from_ints(-402, 25, 200),
    Vector::from_ints(-22, -24, -565),
    Vector::from_ints(161, 404, -318),
    Vector::from_ints(450, -44, -318),
    Vector::from_ints(121, -454, -262),
    Vector::from_ints(-369, -266, -230),
    Vector::from_ints(-348, 263, -263),
];

/// Lower per-axis scaling bound observed on the fixture
pub const DEFAULT_SCALE_MIN: Vector = Vector::from_ints(-505, -521, -620);

/// Upper per-axis scaling bound observed on the fixture
pub const DEFAULT_SCALE_MAX: Vector = Vector::from_ints(549, 506, 476);

// ============================================================================
// Face Identifier
// ============================================================================

/// Index of a fixture face, always in `0..FACE_COUNT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FaceId(u8);

impl FaceId {
    /// Face 0, first in scan order
    pub const FIRST: Self = Self(0);

    /// Create a face id, returning `None` when out of range.
    #[inline]
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < FACE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Face index as `usize` for table lookups.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw face number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterate over every face in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..FACE_COUNT as u8).map(Self)
    }
}

impl TryFrom<u8> for FaceId {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ConfigError::FaceOutOfRange { index: value })
    }
}

impl From<FaceId> for u8 {
    fn from(face: FaceId) -> Self {
        face.0
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Scaling Bounds
// ============================================================================

/// Per-axis range that raw readings are normalized against.
///
/// One instance is shared between table construction and live sample
/// decoding; classification is only meaningful when both sides use the same
/// bounds.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    min: Vector,
    max: Vector,
}

impl ScaleBounds {
    /// Validate and create bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonFiniteValue`] for NaN/infinite components and
    /// [`ConfigError::DegenerateBounds`] when `max <= min` on any axis.
    pub fn new(min: Vector, max: Vector) -> Result<Self, ConfigError> {
        if !min.is_finite() {
            return Err(ConfigError::NonFiniteValue { field: "scale_min" });
        }
        if !max.is_finite() {
            return Err(ConfigError::NonFiniteValue { field: "scale_max" });
        }

        for (axis, lo, hi) in [
            (Axis::X, min.x, max.x),
            (Axis::Y, min.y, max.y),
            (Axis::Z, min.z, max.z),
        ] {
            if hi <= lo {
                return Err(ConfigError::DegenerateBounds { axis, min: lo, max: hi });
            }
        }

        Ok(Self { min, max })
    }

    /// Lower bound.
    #[inline]
    pub const fn min(&self) -> Vector {
        self.min
    }

    /// Upper bound.
    #[inline]
    pub const fn max(&self) -> Vector {
        self.max
    }

    /// Normalize a raw reading into `[-1, 1]` per axis.
    #[inline]
    #[must_use]
    pub fn normalize(&self, raw: Vector) -> Vector {
        raw.scale_to_range(self.min, self.max)
    }

    /// Full transform applied to both reference faces and live samples:
    /// normalize, treat as degrees, convert to a rotation.
    #[must_use]
    pub fn to_rotation(&self, raw: Vector) -> Rotation {
        Rotation::from_vector(self.normalize(raw).to_radians())
    }
}

impl Default for ScaleBounds {
    fn default() -> Self {
        Self { min: DEFAULT_SCALE_MIN, max: DEFAULT_SCALE_MAX }
    }
}

// ============================================================================
// Reference Table
// ============================================================================

/// Precomputed rotations for all fixture faces.
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    rotations: [Rotation; FACE_COUNT],
    bounds: ScaleBounds,
}

impl ReferenceTable {
    /// Build the table from raw face readings and scaling bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonFiniteValue`] if any face reading is not
    /// finite.
    pub fn new(faces: &[Vector; FACE_COUNT], bounds: ScaleBounds) -> Result<Self, ConfigError> {
        if faces.iter().any(|face| !face.is_finite()) {
            return Err(ConfigError::NonFiniteValue { field: "faces" });
        }

        let rotations = faces.map(|face| bounds.to_rotation(face));
        Ok(Self { rotations, bounds })
    }

    /// Build the table from a slice, checking the face count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WrongFaceCount`] unless exactly
    /// [`FACE_COUNT`] readings are supplied.
    pub fn from_slice(faces: &[Vector], bounds: ScaleBounds) -> Result<Self, ConfigError> {
        let faces: &[Vector; FACE_COUNT] = faces.try_into().map_err(|_| {
            ConfigError::WrongFaceCount { got: faces.len(), expected: FACE_COUNT }
        })?;
        Self::new(faces, bounds)
    }

    /// Table for the built-in fixture calibration.
    #[must_use]
    pub fn default_fixture() -> Self {
        let bounds = ScaleBounds::default();
        Self {
            rotations: DEFAULT_FACE_NORMALS.map(|face| bounds.to_rotation(face)),
            bounds,
        }
    }

    /// Rotation for a face.
    #[inline]
    pub fn rotation(&self, face: FaceId) -> &Rotation {
        &self.rotations[face.index()]
    }

    /// Bounds used to build this table.
    #[inline]
    pub fn bounds(&self) -> &ScaleBounds {
        &self.bounds
    }

    /// Iterate over `(face, rotation)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (FaceId, &Rotation)> {
        FaceId::all().zip(self.rotations.iter())
    }
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::default_fixture()
    }
}
