//! Face tracker
//!
//! Drives a [`FacePipeline`] from a stream of [`SourceEvent`]s and hands
//! confirmed faces to the trigger worker. The tracker never waits on the
//! trigger; submission is fire-and-forget.
//!
//! A disconnect does not reset the debounce state. When the same tracker
//! sees a reconnect, the resumed stream keeps feeding the existing state
//! unless [`FaceTracker::reset`] is called.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use trackahedron_core::{DebounceEvent, FaceId};

use crate::config::{ConfigFileError, TrackerConfig, TriggerBackend};
use crate::pipeline::FacePipeline;
use crate::source::{SampleEvent, SourceError, SourceEvent};
use crate::trigger::{label_for, ActivityTrigger, LogTrigger, TriggerError, TriggerHandle};

/// Errors raised while setting up or running a tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigFileError),

    /// Trigger back-end could not be created
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// Sample source could not be opened
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Totals reported when a tracker run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerSummary {
    /// Samples received
    pub samples: u64,
    /// Samples dropped as malformed
    pub malformed: u64,
    /// Confirmed face changes
    pub confirmations: u64,
    /// Labels accepted by the trigger worker
    pub submitted: u64,
    /// Labels the trigger worker could not accept
    pub rejected: u64,
    /// Disconnects observed
    pub disconnects: u64,
    /// Face confirmed when the run ended
    pub confirmed: Option<FaceId>,
}

/// Create the trigger back-end selected by `config`.
///
/// `dry_run` forces the log back-end.
///
/// # Errors
///
/// Returns [`TriggerError::Config`] when the selected back-end is unavailable
/// or misconfigured.
pub fn build_trigger(
    config: &TrackerConfig,
    dry_run: bool,
) -> Result<Arc<dyn ActivityTrigger>, TrackerError> {
    let backend = if dry_run { TriggerBackend::Log } else { config.trigger.backend };

    match backend {
        TriggerBackend::Log => Ok(Arc::new(LogTrigger)),
        #[cfg(feature = "toggl")]
        TriggerBackend::Toggl => Ok(Arc::new(crate::trigger::toggl::TogglTrigger::new(&config.toggl)?)),
        #[cfg(not(feature = "toggl"))]
        TriggerBackend::Toggl => Err(TriggerError::Config(
            "toggl backend requires the `toggl` feature".to_string(),
        )
        .into()),
    }
}

/// Connects one sample stream to the trigger worker.
pub struct FaceTracker {
    pipeline: FacePipeline,
    trigger: TriggerHandle,
    label_template: String,
    submitted: u64,
    rejected: u64,
    disconnects: u64,
}

impl FaceTracker {
    /// Create a tracker.
    pub fn new(pipeline: FacePipeline, trigger: TriggerHandle, label_template: impl Into<String>) -> Self {
        Self {
            pipeline,
            trigger,
            label_template: label_template.into(),
            submitted: 0,
            rejected: 0,
            disconnects: 0,
        }
    }

    /// Create a tracker from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline cannot be built.
    pub fn from_config(config: &TrackerConfig, trigger: TriggerHandle) -> Result<Self, TrackerError> {
        let pipeline = FacePipeline::from_config(config)?;
        Ok(Self::new(pipeline, trigger, config.trigger.label_template.clone()))
    }

    /// Process one sample; returns the face if it was newly confirmed.
    pub fn handle_sample(&mut self, sample: &SampleEvent) -> Option<FaceId> {
        match self.pipeline.process(&sample.payload, sample.timestamp_ms)? {
            DebounceEvent::PendingChanged { face, since_ms } => {
                tracing::debug!(face = %face, since_ms, "Pending face changed");
                None
            }
            DebounceEvent::Confirmed { face, at_ms } => {
                let label = label_for(&self.label_template, face);
                tracing::info!(face = %face, at_ms, label = %label, "Face confirmed");

                if self.trigger.submit(label) {
                    self.submitted += 1;
                } else {
                    self.rejected += 1;
                }
                Some(face)
            }
        }
    }

    /// Process one source event; returns the face if it was newly confirmed.
    pub fn handle_event(&mut self, event: SourceEvent) -> Option<FaceId> {
        match event {
            SourceEvent::Connected { name } => {
                tracing::info!(sensor = %name, "Sensor connected");
                None
            }
            SourceEvent::Sample(sample) => self.handle_sample(&sample),
            SourceEvent::Disconnected { reason } => {
                self.disconnects += 1;
                tracing::warn!(reason = reason.as_deref().unwrap_or("unknown"), "Sensor disconnected");
                None
            }
        }
    }

    /// Consume events until the source closes its channel.
    pub async fn run(&mut self, mut events: mpsc::Receiver<SourceEvent>) -> TrackerSummary {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        self.summary()
    }

    /// Current totals.
    pub fn summary(&self) -> TrackerSummary {
        let stats = self.pipeline.stats();
        TrackerSummary {
            samples: stats.samples,
            malformed: stats.malformed,
            confirmations: stats.confirmations,
            submitted: self.submitted,
            rejected: self.rejected,
            disconnects: self.disconnects,
            confirmed: self.pipeline.confirmed(),
        }
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &FacePipeline {
        &self.pipeline
    }

    /// Explicitly discard debounce state, e.g. before tracking a new sensor.
    pub fn reset(&mut self) {
        self.pipeline.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use trackahedron_core::encode_sample;
    use trackahedron_core::reference::DEFAULT_FACE_NORMALS;

    use crate::trigger::{TriggerResult, TriggerWorker};

    #[derive(Default)]
    struct RecordingTrigger {
        labels: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ActivityTrigger for RecordingTrigger {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn start(&self, label: &str) -> TriggerResult<()> {
            self.labels.lock().unwrap().push(label.to_string());
            Ok(())
        }

        async fn stop(&self) -> TriggerResult<()> {
            Ok(())
        }
    }

    fn sample(face: usize, at_ms: u64) -> SourceEvent {
        SourceEvent::Sample(SampleEvent::new(at_ms, encode_sample(DEFAULT_FACE_NORMALS[face]).to_vec()))
    }

    #[tokio::test]
    async fn test_confirmed_face_submits_label() {
        let trigger = Arc::new(RecordingTrigger::default());
        let (handle, worker) = TriggerWorker::spawn(trigger.clone());
        let mut tracker = FaceTracker::new(FacePipeline::default(), handle, "Project {face}");

        assert_eq!(tracker.handle_event(sample(5, 0)), None);
        assert_eq!(tracker.handle_event(sample(5, 3001)), FaceId::new(5));
        assert_eq!(tracker.handle_event(sample(5, 9000)), None);

        let summary = tracker.summary();
        assert_eq!(summary.confirmations, 1);
        assert_eq!(summary.submitted, 1);

        drop(tracker);
        worker.await.unwrap();
        assert_eq!(*trigger.labels.lock().unwrap(), vec!["Project 5"]);
    }

    #[tokio::test]
    async fn test_disconnect_keeps_debounce_state() {
        let (handle, _worker) = TriggerWorker::spawn(Arc::new(LogTrigger));
        let mut tracker = FaceTracker::new(FacePipeline::default(), handle, "Project {face}");

        tracker.handle_event(SourceEvent::Connected { name: "a".to_string() });
        tracker.handle_event(sample(2, 0));
        tracker.handle_event(SourceEvent::Disconnected { reason: None });
        tracker.handle_event(SourceEvent::Connected { name: "a".to_string() });

        // Dwell clock still runs from the sample before the disconnect
        assert_eq!(tracker.handle_event(sample(2, 3001)), FaceId::new(2));
        assert_eq!(tracker.summary().disconnects, 1);
    }

    #[tokio::test]
    async fn test_reset_restarts_dwell() {
        let (handle, _worker) = TriggerWorker::spawn(Arc::new(LogTrigger));
        let mut tracker = FaceTracker::new(FacePipeline::default(), handle, "Project {face}");

        tracker.handle_event(sample(2, 0));
        tracker.reset();
        assert_eq!(tracker.handle_event(sample(2, 3001)), None);
        assert_eq!(tracker.handle_event(sample(2, 6002)), FaceId::new(2));
    }

    #[tokio::test]
    async fn test_run_until_source_closes() {
        let (handle, _worker) = TriggerWorker::spawn(Arc::new(LogTrigger));
        let mut tracker = FaceTracker::new(FacePipeline::default(), handle, "Project {face}");

        let (tx, rx) = mpsc::channel(8);
        tx.send(sample(7, 0)).await.unwrap();
        tx.send(SourceEvent::Sample(SampleEvent::new(100, vec![0; 3]))).await.unwrap();
        tx.send(sample(7, 3500)).await.unwrap();
        drop(tx);

        let summary = tracker.run(rx).await;
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.confirmed, FaceId::new(7));
    }

    #[test]
    fn test_build_trigger_dry_run_forces_log() {
        let mut config = TrackerConfig::default();
        config.trigger.backend = TriggerBackend::Toggl;
        let trigger = build_trigger(&config, true).unwrap();
        assert_eq!(trigger.name(), "log");
    }

    #[cfg(not(feature = "toggl"))]
    #[test]
    fn test_build_trigger_without_toggl_feature() {
        let mut config = TrackerConfig::default();
        config.trigger.backend = TriggerBackend::Toggl;
        assert!(matches!(
            build_trigger(&config, false),
            Err(TrackerError::Trigger(TriggerError::Config(_)))
        ));
    }
}
