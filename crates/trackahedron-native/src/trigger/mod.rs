//! Activity triggers
//!
//! A confirmed face change is turned into a label (see [`label_for`]) and
//! handed to an [`ActivityTrigger`]. Triggers may block on the network, so
//! they never run on the sample path: the [`TriggerWorker`] owns the trigger
//! and executes requests one at a time on a background task.
//!
//! # Back-ends
//!
//! - [`LogTrigger`]: logs each activity change, always available
//! - [`toggl::TogglTrigger`]: starts Toggl time entries (`toggl` feature)

mod worker;

#[cfg(feature = "toggl")]
pub mod toggl;

use async_trait::async_trait;
use thiserror::Error;
use trackahedron_core::FaceId;

use crate::config::FACE_PLACEHOLDER;

pub use worker::{TriggerHandle, TriggerWorker, WorkerStats};

/// Errors raised by trigger back-ends.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// HTTP transport failure
    #[cfg(feature = "toggl")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with an error status
    #[error("API returned status {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Still rate limited after all retries
    #[error("Rate limited after {attempts} attempts")]
    RateLimited {
        /// Attempts made
        attempts: u32,
    },

    /// Back-end cannot run with the given settings
    #[error("Trigger misconfigured: {0}")]
    Config(String),
}

/// Result type for trigger operations.
pub type TriggerResult<T> = Result<T, TriggerError>;

/// An external action run when the tracked activity changes.
#[async_trait]
pub trait ActivityTrigger: Send + Sync {
    /// Back-end name used in logs
    fn name(&self) -> &'static str;

    /// Start tracking `label`, ending whatever was tracked before.
    async fn start(&self, label: &str) -> TriggerResult<()>;

    /// Stop the running activity, if any.
    async fn stop(&self) -> TriggerResult<()>;
}

/// Trigger that only logs activity changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTrigger;

#[async_trait]
impl ActivityTrigger for LogTrigger {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn start(&self, label: &str) -> TriggerResult<()> {
        tracing::info!(label = %label, "Activity started");
        Ok(())
    }

    async fn stop(&self) -> TriggerResult<()> {
        tracing::info!("Activity stopped");
        Ok(())
    }
}

/// Render the activity label for a face.
///
/// Every `{face}` in `template` is replaced with the face number.
pub fn label_for(template: &str, face: FaceId) -> String {
    template.replace(FACE_PLACEHOLDER, &face.to_string())
}
