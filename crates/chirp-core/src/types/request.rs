//! Playback request types.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AudioBuffer, Ownership};

/// Identifier assigned to a request when it is admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters of a synthesized tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Beep {
    /// Tone frequency in Hz.
    pub frequency: i32,
    /// Tone length in milliseconds.
    pub duration_ms: i32,
    /// Peak sample value.
    pub amplitude: i32,
    /// Block the caller until the tone has played.
    pub modal: bool,
}

impl Default for Beep {
    fn default() -> Self {
        Self {
            frequency: 2000,
            duration_ms: 200,
            amplitude: 10000,
            modal: false,
        }
    }
}

/// A single playback request.
#[derive(Debug)]
pub enum PlaybackRequest {
    /// Play PCM samples as-is.
    RawAudio { buffer: AudioBuffer, modal: bool },
    /// Synthesize and play a sine tone.
    Tone {
        frequency_hz: i32,
        duration_ms: i32,
        amplitude: i32,
        modal: bool,
    },
}

impl PlaybackRequest {
    pub const fn raw(buffer: AudioBuffer, modal: bool) -> Self {
        Self::RawAudio { buffer, modal }
    }

    pub const fn is_modal(&self) -> bool {
        match self {
            Self::RawAudio { modal, .. } | Self::Tone { modal, .. } => *modal,
        }
    }

    /// Ownership of the buffer this request will play from.
    pub const fn ownership(&self) -> Ownership {
        match self {
            Self::RawAudio { buffer, .. } => buffer.ownership(),
            Self::Tone { .. } => Ownership::EngineOwned,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RawAudio { .. } => "raw",
            Self::Tone { .. } => "tone",
        }
    }
}

impl From<Beep> for PlaybackRequest {
    fn from(beep: Beep) -> Self {
        Self::Tone {
            frequency_hz: beep.frequency,
            duration_ms: beep.duration_ms,
            amplitude: beep.amplitude,
            modal: beep.modal,
        }
    }
}

/// A request waiting in the queue.
#[derive(Debug)]
pub struct QueueEntry {
    pub id: RequestId,
    pub request: PlaybackRequest,
}

impl QueueEntry {
    pub const fn new(id: RequestId, request: PlaybackRequest) -> Self {
        Self { id, request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beep_defaults() {
        let beep = Beep::default();
        assert_eq!(beep.frequency, 2000);
        assert_eq!(beep.duration_ms, 200);
        assert_eq!(beep.amplitude, 10000);
        assert!(!beep.modal);
    }

    #[test]
    fn test_beep_into_tone() {
        let request = PlaybackRequest::from(Beep {
            modal: true,
            ..Beep::default()
        });
        assert!(request.is_modal());
        assert_eq!(request.ownership(), Ownership::EngineOwned);
        assert_eq!(request.kind(), "tone");
    }

    #[test]
    fn test_raw_ownership() {
        let shared: std::sync::Arc<[u8]> = std::sync::Arc::from(vec![0u8; 4]);
        let request = PlaybackRequest::raw(AudioBuffer::caller_owned(shared), false);
        assert!(!request.is_modal());
        assert_eq!(request.ownership(), Ownership::CallerOwned);
    }

    #[test]
    fn test_beep_partial_json() {
        let beep: Beep = serde_json::from_str(r#"{"frequency": 440}"#).unwrap();
        assert_eq!(beep.frequency, 440);
        assert_eq!(beep.duration_ms, 200);
    }
}
