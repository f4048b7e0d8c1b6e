//! Nearest-face classification
//!
//! A linear scan over the 12 reference rotations. Ranking uses
//! [`Rotation::distance`]; ties keep the lowest face index because the scan
//! only replaces the current best on a strictly smaller distance.

use serde::{Deserialize, Serialize};

use crate::reference::{FaceId, ReferenceTable};
use crate::rotation::Rotation;
use crate::sample::decode_sample;

/// Result of classifying one sample.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Closest face
    pub face: FaceId,
    /// Rotation distance to that face's reference
    pub distance: f64,
}

/// Stateless classifier over a fixed reference table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Classifier {
    table: ReferenceTable,
}

impl Classifier {
    /// Create a classifier for a reference table.
    #[must_use]
    pub fn new(table: ReferenceTable) -> Self {
        Self { table }
    }

    /// Classifier for the built-in fixture calibration.
    #[must_use]
    pub fn default_fixture() -> Self {
        Self::new(ReferenceTable::default_fixture())
    }

    /// The reference table in use.
    #[inline]
    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }

    /// Find the reference face closest to `sample`.
    pub fn classify(&self, sample: &Rotation) -> Classification {
        let mut best = Classification {
            face: FaceId::FIRST,
            distance: self.table.rotation(FaceId::FIRST).distance(sample),
        };

        for (face, reference) in self.table.iter().skip(1) {
            let distance = reference.distance(sample);
            if distance < best.distance {
                best = Classification { face, distance };
            }
        }

        best
    }

    /// Decode a raw payload, run it through the table's transform and
    /// classify it.
    ///
    /// Returns `None` for malformed payloads.
    pub fn classify_raw(&self, buf: &[u8]) -> Option<Classification> {
        let raw = decode_sample(buf)?;
        let rotation = self.table.bounds().to_rotation(raw);
        Some(self.classify(&rotation))
    }
}
