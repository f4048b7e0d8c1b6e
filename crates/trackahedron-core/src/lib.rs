//! Trackahedron Core - `no_std` compatible orientation classification
//!
//! This crate turns raw 3-axis sensor samples streamed from the Trackahedron
//! fixture into a stable "current face" signal. It is designed to work in
//! `no_std` environments as well as `std` environments, and performs no
//! allocation.
//!
//! # Modules
//!
//! - [`vector`]: 3-component value type with range remapping
//! - [`rotation`]: Quaternion model, yaw/pitch/roll conversion and distance
//! - [`reference`]: Scaling bounds and the fixed table of 12 face rotations
//! - [`sample`]: Raw 6-byte sample decoding
//! - [`classifier`]: Nearest-face search over the reference table
//! - [`debounce`]: Dwell-time hysteresis turning raw classifications into
//!   confirmed face changes
//! - [`error`]: Configuration error type
//!
//! # Features
//!
//! - `std`: Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```rust
//! use trackahedron_core::{Classifier, DebounceEvent, DebounceStateMachine, FaceId};
//!
//! let classifier = Classifier::default_fixture();
//! let mut debounce = DebounceStateMachine::default();
//!
//! // An all-zero sample sits closest to face 0 of the built-in fixture
//! let hit = classifier.classify_raw(&[0; 6]).unwrap();
//! assert_eq!(hit.face, FaceId::new(0).unwrap());
//!
//! assert!(matches!(
//!     debounce.on_classification(hit.face, 0),
//!     Some(DebounceEvent::PendingChanged { .. })
//! ));
//! assert!(debounce.on_classification(hit.face, 2_000).is_none());
//! assert!(matches!(
//!     debounce.on_classification(hit.face, 3_001),
//!     Some(DebounceEvent::Confirmed { .. })
//! ));
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[cfg(feature = "std")]
extern crate std;

pub mod classifier;
pub mod debounce;
pub mod error;
pub mod reference;
pub mod rotation;
pub mod sample;
pub mod vector;

// Re-export commonly used types at crate root
pub use classifier::{Classification, Classifier};
pub use debounce::{DebounceEvent, DebounceStateMachine, DEFAULT_DWELL_MS};
pub use error::ConfigError;
pub use reference::{FaceId, ReferenceTable, ScaleBounds, FACE_COUNT};
pub use rotation::Rotation;
pub use sample::{decode_sample, encode_sample, SAMPLE_LEN};
pub use vector::Vector;
