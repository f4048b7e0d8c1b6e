//! Error types for Trackahedron Core
//!
//! Only configuration can fail in the core. Per-sample problems (a buffer of
//! the wrong length) are not errors; the sample is simply dropped.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Axis of a 3-component vector, used to point at a bad bound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
        }
    }
}

/// Errors raised while building the classification configuration.
///
/// These are fatal at startup and never occur per sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConfigError {
    /// Scaling range is empty or inverted on an axis
    DegenerateBounds {
        /// Offending axis
        axis: Axis,
        /// Lower bound on that axis
        min: f64,
        /// Upper bound on that axis
        max: f64,
    },
    /// A bound or face component is NaN or infinite
    NonFiniteValue {
        /// Where the value came from
        field: &'static str,
    },
    /// Reference table does not have exactly one entry per face
    WrongFaceCount {
        /// Number of entries supplied
        got: usize,
        /// Number of faces on the fixture
        expected: usize,
    },
    /// Face number outside `0..FACE_COUNT`
    FaceOutOfRange {
        /// Offending face number
        index: u8,
    },
    /// Dwell threshold of zero would confirm on the second sample
    ZeroDwell,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateBounds { axis, min, max } => {
                write!(f, "Degenerate scaling bounds on {axis} axis: min {min} >= max {max}")
            }
            Self::NonFiniteValue { field } => {
                write!(f, "Non-finite value in {field}")
            }
            Self::WrongFaceCount { got, expected } => {
                write!(f, "Reference table has {got} faces, expected {expected}")
            }
            Self::FaceOutOfRange { index } => {
                write!(f, "Face {index} is out of range")
            }
            Self::ZeroDwell => write!(f, "Dwell threshold must be greater than zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
