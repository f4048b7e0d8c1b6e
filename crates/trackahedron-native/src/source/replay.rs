//! Replay of recorded sample captures
//!
//! A capture is a text file with one sample per line:
//!
//! ```text
//! # timestamp_ms  payload (hex)
//! 0     351e21060d91
//! 1000  351e21060d91
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Payloads are not
//! length-checked here so that captures can reproduce malformed packets.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use super::{SampleEvent, SourceError, SourceEvent, SourceResult};

/// Channel capacity for replayed events
const REPLAY_CHANNEL_CAPACITY: usize = 256;

/// A parsed capture ready to be replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySource {
    name: String,
    samples: Vec<SampleEvent>,
}

impl ReplaySource {
    /// Parse capture text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Parse`] for a line without a valid timestamp
    /// and hex payload.
    pub fn parse(name: impl Into<String>, content: &str) -> SourceResult<Self> {
        let mut samples = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parse_err = |reason: String| SourceError::Parse { line: idx + 1, reason };

            let mut fields = line.split_whitespace();
            let (Some(ts), Some(hex_payload), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(parse_err("expected `<timestamp_ms> <hex payload>`".to_string()));
            };

            let timestamp_ms = ts
                .parse::<u64>()
                .map_err(|e| parse_err(format!("bad timestamp {ts:?}: {e}")))?;
            let payload = hex::decode(hex_payload)
                .map_err(|e| parse_err(format!("bad payload {hex_payload:?}: {e}")))?;

            samples.push(SampleEvent { timestamp_ms, payload });
        }

        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    /// Read and parse a capture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::parse(path.display().to_string(), &content)
    }

    /// Capture name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed samples in file order.
    pub fn samples(&self) -> &[SampleEvent] {
        &self.samples
    }

    /// Replay the capture on a background task.
    ///
    /// The stream is framed by `Connected` and `Disconnected` events. With
    /// `paced` set, the task sleeps between samples according to their
    /// timestamps; otherwise samples are delivered as fast as they are read.
    pub fn spawn(self, paced: bool) -> mpsc::Receiver<SourceEvent> {
        let (tx, rx) = mpsc::channel(REPLAY_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            tracing::info!(capture = %self.name, samples = self.samples.len(), "Replaying capture");

            if tx.send(SourceEvent::Connected { name: self.name }).await.is_err() {
                return;
            }

            let mut previous_ms = self.samples.first().map_or(0, |s| s.timestamp_ms);
            for sample in self.samples {
                if paced {
                    let gap = sample.timestamp_ms.saturating_sub(previous_ms);
                    tokio::time::sleep(Duration::from_millis(gap)).await;
                }
                previous_ms = sample.timestamp_ms;

                if tx.send(SourceEvent::Sample(sample)).await.is_err() {
                    tracing::debug!("Replay receiver dropped");
                    return;
                }
            }

            let _ = tx
                .send(SourceEvent::Disconnected {
                    reason: Some("end of capture".to_string()),
                })
                .await;
        });

        rx
    }
}
