//! Per-connection classification pipeline
//!
//! Couples a [`Classifier`] with a [`DebounceStateMachine`]. One pipeline is
//! owned by exactly one sensor connection; nothing here is shared.

use trackahedron_core::{Classification, Classifier, DebounceEvent, DebounceStateMachine, FaceId};

use crate::config::{ConfigResult, TrackerConfig};

/// Counters for samples seen by a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Payloads received
    pub samples: u64,
    /// Payloads dropped for having the wrong length
    pub malformed: u64,
    /// Pending face changes
    pub pending_changes: u64,
    /// Confirmed face changes
    pub confirmations: u64,
}

/// Raw payloads in, debounced face events out.
#[derive(Debug, Clone)]
pub struct FacePipeline {
    classifier: Classifier,
    debounce: DebounceStateMachine,
    last: Option<Classification>,
    stats: PipelineStats,
}

impl FacePipeline {
    /// Create a pipeline from its parts.
    pub fn new(classifier: Classifier, debounce: DebounceStateMachine) -> Self {
        Self {
            classifier,
            debounce,
            last: None,
            stats: PipelineStats::default(),
        }
    }

    /// Build a pipeline from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference table or dwell are invalid.
    pub fn from_config(config: &TrackerConfig) -> ConfigResult<Self> {
        let classifier = Classifier::new(config.build_table()?);
        let debounce = config.build_debounce()?;
        Ok(Self::new(classifier, debounce))
    }

    /// Process one raw payload received at `now_ms`.
    ///
    /// Malformed payloads are counted and dropped without touching the
    /// debounce state.
    pub fn process(&mut self, payload: &[u8], now_ms: u64) -> Option<DebounceEvent> {
        self.stats.samples += 1;

        let Some(hit) = self.classifier.classify_raw(payload) else {
            self.stats.malformed += 1;
            tracing::trace!(len = payload.len(), "Dropping malformed sample");
            return None;
        };

        self.last = Some(hit);
        tracing::trace!(face = %hit.face, distance = hit.distance, "Classified sample");

        let event = self.debounce.on_classification(hit.face, now_ms);
        match event {
            Some(DebounceEvent::PendingChanged { .. }) => self.stats.pending_changes += 1,
            Some(DebounceEvent::Confirmed { .. }) => self.stats.confirmations += 1,
            None => {}
        }
        event
    }

    /// Last successful raw classification.
    pub fn last_classification(&self) -> Option<Classification> {
        self.last
    }

    /// Currently confirmed face.
    pub fn confirmed(&self) -> Option<FaceId> {
        self.debounce.confirmed()
    }

    /// Sample counters.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Forget all debounce state. Counters are kept.
    pub fn reset(&mut self) {
        self.debounce.reset();
        self.last = None;
    }
}

impl Default for FacePipeline {
    fn default() -> Self {
        Self::new(Classifier::default_fixture(), DebounceStateMachine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackahedron_core::reference::DEFAULT_FACE_NORMALS;
    use trackahedron_core::encode_sample;

    fn face_bytes(i: usize) -> [u8; 6] {
        encode_sample(DEFAULT_FACE_NORMALS[i])
    }

    #[test]
    fn test_confirms_held_face() {
        let mut pipeline = FacePipeline::default();
        let bytes = face_bytes(3);

        assert!(matches!(
            pipeline.process(&bytes, 0),
            Some(DebounceEvent::PendingChanged { .. })
        ));
        assert_eq!(pipeline.process(&bytes, 1000), None);
        assert_eq!(pipeline.process(&bytes, 2000), None);

        let face = FaceId::new(3).unwrap();
        assert_eq!(
            pipeline.process(&bytes, 3500),
            Some(DebounceEvent::Confirmed { face, at_ms: 3500 })
        );
        assert_eq!(pipeline.confirmed(), Some(face));
        assert_eq!(pipeline.last_classification().map(|c| c.face), Some(face));
    }

    #[test]
    fn test_malformed_does_not_touch_state() {
        let mut pipeline = FacePipeline::default();
        let bytes = face_bytes(8);

        pipeline.process(&bytes, 0);
        assert_eq!(pipeline.process(&[1, 2, 3], 1000), None);
        assert_eq!(pipeline.process(&[0; 7], 2000), None);

        // Dwell clock still runs from the first sample
        assert!(matches!(
            pipeline.process(&bytes, 3001),
            Some(DebounceEvent::Confirmed { .. })
        ));

        let stats = pipeline.stats();
        assert_eq!(stats.samples, 4);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.pending_changes, 1);
        assert_eq!(stats.confirmations, 1);
    }

    #[test]
    fn test_from_config_uses_dwell() {
        let mut config = TrackerConfig::default();
        config.classifier.dwell_ms = 100;
        let mut pipeline = FacePipeline::from_config(&config).unwrap();
        let bytes = face_bytes(1);

        pipeline.process(&bytes, 0);
        assert!(matches!(
            pipeline.process(&bytes, 101),
            Some(DebounceEvent::Confirmed { .. })
        ));
    }

    #[test]
    fn test_reset_keeps_counters() {
        let mut pipeline = FacePipeline::default();
        let bytes = face_bytes(0);
        pipeline.process(&bytes, 0);
        pipeline.process(&bytes, 5000);

        pipeline.reset();
        assert_eq!(pipeline.confirmed(), None);
        assert!(pipeline.last_classification().is_none());
        assert_eq!(pipeline.stats().samples, 2);
    }
}
