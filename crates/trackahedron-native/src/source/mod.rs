//! Sample sources
//!
//! A source delivers [`SourceEvent`]s over an `mpsc` channel: connection
//! changes plus raw 6-byte payloads stamped with a monotonic millisecond
//! timestamp. Sources never interpret payloads; malformed ones are passed
//! through and dropped further down the pipeline.

#[cfg(feature = "ble")]
pub mod ble;
pub mod replay;

use std::path::PathBuf;

use thiserror::Error;

pub use replay::ReplaySource;

/// One raw sample notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEvent {
    /// Monotonic receive time (ms)
    pub timestamp_ms: u64,
    /// Raw payload as delivered by the transport
    pub payload: Vec<u8>,
}

impl SampleEvent {
    /// Create a sample event.
    pub fn new(timestamp_ms: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp_ms,
            payload: payload.into(),
        }
    }
}

/// Events emitted by a sample source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Sensor link established
    Connected {
        /// Peripheral or capture name
        name: String,
    },
    /// Raw sample received
    Sample(SampleEvent),
    /// Sensor link lost
    Disconnected {
        /// Reason, if known
        reason: Option<String>,
    },
}

/// Errors raised while opening or reading a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Capture file could not be read
    #[error("Failed to read capture {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Capture line is malformed
    #[error("Invalid capture line {line}: {reason}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },

    /// No matching sensor was found
    #[error("No sensor found: {0}")]
    NotFound(String),
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
