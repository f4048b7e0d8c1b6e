//! Trackahedron Native - host runtime for face tracking
//!
//! This crate wires the `no_std` core into a running service:
//! - Configuration loading (TOML file, environment overrides)
//! - Per-connection classification and debounce pipeline
//! - Serialized background dispatch of time-tracking triggers
//! - Sample sources (BLE notifications, replay captures)
//!
//! # Modules
//!
//! - [`config`]: Tracker configuration and validation
//! - [`pipeline`]: Raw sample to debounced face events
//! - [`trigger`]: Activity trigger trait, back-ends and the trigger worker
//! - [`source`]: Sample sources feeding the tracker
//! - [`tracker`]: Glue between a source, a pipeline and the trigger worker
//!
//! # Example
//!
//! ```rust,ignore
//! use trackahedron_native::{build_trigger, FaceTracker, ReplaySource, TrackerConfig, TriggerWorker};
//!
//! let config = TrackerConfig::load(None)?;
//! let (handle, worker) = TriggerWorker::spawn(build_trigger(&config, false)?);
//! let mut tracker = FaceTracker::from_config(&config, handle)?;
//!
//! let events = ReplaySource::from_file("capture.txt").await?.spawn(false);
//! let summary = tracker.run(events).await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod pipeline;
pub mod source;
pub mod tracker;
pub mod trigger;

// Re-export key types
pub use config::{ConfigFileError, TrackerConfig, TriggerBackend};
pub use pipeline::{FacePipeline, PipelineStats};
pub use source::{ReplaySource, SampleEvent, SourceError, SourceEvent};
pub use tracker::{build_trigger, FaceTracker, TrackerError, TrackerSummary};
pub use trigger::{
    label_for, ActivityTrigger, LogTrigger, TriggerError, TriggerHandle, TriggerWorker,
    WorkerStats,
};

#[cfg(feature = "toggl")]
pub use trigger::toggl::TogglTrigger;

#[cfg(feature = "ble")]
pub use source::ble::{BleSensorLink, DiscoveredSensor};
