//! Error types for chirp.

use thiserror::Error;

use crate::types::Ticks;

/// Result type alias using chirp's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chirp.
#[derive(Error, Debug)]
pub enum Error {
    // Admission errors
    #[error("Request queue full, not admitted within {timeout}")]
    QueueFull { timeout: Ticks },

    #[error("Request queue closed")]
    QueueClosed,

    #[error("Audio sink busy, not acquired within {timeout}")]
    SinkBusy { timeout: Ticks },

    // Sink errors
    #[error("Audio sink timed out after {written} of {requested} samples")]
    SinkTimeout { written: usize, requested: usize },

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    // Setup errors
    #[error("Unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Generic errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if the request was refused at admission and may be retried.
    pub const fn is_admission_failure(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::SinkBusy { .. })
    }

    /// Returns true if this error aborted a request that was already playing.
    pub const fn is_sink_failure(&self) -> bool {
        matches!(self, Self::SinkTimeout { .. } | Self::AudioOutput(_))
    }
}
