//! Replay captures through the full tracker and trigger worker.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use trackahedron_core::FaceId;
use trackahedron_native::trigger::TriggerResult;
use trackahedron_native::{
    ActivityTrigger, FaceTracker, ReplaySource, SourceError, TrackerConfig, TriggerWorker,
};

/// Face 3 settles, a brief flicker through face 8, then face 4 settles.
const CAPTURE: &str = "\
# timestamp_ms payload
0     351e21060d91
1000  351e21060d91
2000  351e21060d91
3500  351e21060d91
4000  3999fa5ed74c
4100  f5a23872124e
4200  0000
5000  f5a23872124e
7000  f5a23872124e
7101  f5a23872124e
9000  f5a23872124e
";

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

#[tokio::test]
async fn test_replay_confirms_faces_in_order() {
    let config = TrackerConfig::default();
    let trigger = Arc::new(RecordingTrigger::default());
    let (handle, worker) = TriggerWorker::spawn(trigger.clone());
    let mut tracker = FaceTracker::from_config(&config, handle).unwrap();

    let source = ReplaySource::parse("capture", CAPTURE).unwrap();
    let summary = tracker.run(source.spawn(false)).await;

    assert_eq!(summary.samples, 11);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.confirmations, 2);
    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.disconnects, 1);
    assert_eq!(summary.confirmed, FaceId::new(4));

    drop(tracker);
    let stats = worker.await.unwrap();
    assert_eq!(stats.started + stats.superseded, 2);
    assert_eq!(stats.failed, 0);

    // A slow worker may coalesce the first label away, never reorder them
    let labels = trigger.labels.lock().unwrap().clone();
    assert_eq!(labels.last().map(String::as_str), Some("Project 4"));
    assert!(labels == ["Project 3", "Project 4"] || labels == ["Project 4"]);
}

#[tokio::test]
async fn test_custom_template_and_dwell() {
    let mut config = TrackerConfig::default();
    config.classifier.dwell_ms = 500;
    config.trigger.label_template = "Face #{face}".to_string();
    config.validate().unwrap();

    let trigger = Arc::new(RecordingTrigger::default());
    let (handle, worker) = TriggerWorker::spawn(trigger.clone());
    let mut tracker = FaceTracker::from_config(&config, handle).unwrap();

    let capture = "0 d37521aade56\n400 d37521aade56\n501 d37521aade56\n";
    let source = ReplaySource::parse("short", capture).unwrap();
    let summary = tracker.run(source.spawn(false)).await;
    assert_eq!(summary.confirmed, FaceId::new(11));

    drop(tracker);
    worker.await.unwrap();
    assert_eq!(*trigger.labels.lock().unwrap(), vec!["Face #11"]);
}

#[tokio::test]
async fn test_replay_from_file() {
    let path = std::env::temp_dir().join(format!("trackahedron-replay-{}.txt", std::process::id()));
    tokio::fs::write(&path, CAPTURE).await.unwrap();

    let source = ReplaySource::from_file(&path).await.unwrap();
    assert_eq!(source.samples().len(), 11);

    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn test_corrupt_capture_is_rejected() {
    let err = ReplaySource::parse("bad", "0 351e21060d91\n1000 not-hex\n").unwrap_err();
    assert!(matches!(err, SourceError::Parse { line: 2, .. }));
}
