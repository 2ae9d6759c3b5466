//! Audio sink abstraction.
//!
//! The engine owns exactly one sink and never writes to it from two places at
//! once. Hardware outputs implement [`AudioSink`]; [`CaptureSink`] records
//! what would have been played.

mod capture;

use std::time::Instant;

use chirp_core::{Result, Timeout};

pub use capture::{CaptureSink, SinkFault};

/// A single output accepting one stream of mono 16-bit PCM.
pub trait AudioSink: Send {
    /// Prepare the output for `sample_rate`. Called once before any write.
    ///
    /// Fails with `Error::UnsupportedSampleRate` if the rate cannot be used.
    fn configure(&mut self, sample_rate: u32) -> Result<()>;

    /// Write `samples`, waiting at most `timeout` for room.
    ///
    /// Returns the number of samples accepted. A count below `samples.len()`
    /// means the timeout elapsed first.
    fn write(&mut self, samples: &[i16], timeout: Timeout) -> Result<usize>;

    /// Wait until everything written so far has been played.
    ///
    /// Fails if playback makes no progress for `timeout`.
    fn flush(&mut self, timeout: Timeout) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Instant at which `timeout` elapses, `None` if it never does.
///
/// A bound too far out to represent as an `Instant` counts as unbounded.
pub(crate) fn deadline(timeout: Timeout) -> Option<Instant> {
    timeout
        .as_duration()
        .and_then(|wait| Instant::now().checked_add(wait))
}
