//! Table-driven sine tone synthesis.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use chirp_core::AudioBuffer;
use tracing::trace;

use crate::table::{SINE_TABLE, TABLE_SIZE};

/// Converts (frequency, duration, amplitude) into PCM samples.
///
/// The phase accumulator counts in units of `1 / sample_rate` degrees, so
/// the table index for sample `n` is exactly `floor(n * f * 360 / rate) mod 360`
/// with no floating-point drift over long tones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToneSynth {
    sample_rate: u32,
}

impl ToneSynth {
    pub const fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples a tone of `duration_ms` occupies, rounded half up.
    ///
    /// Saturates at `usize::MAX` where the count does not fit.
    pub fn sample_count(&self, duration_ms: i32) -> usize {
        if duration_ms <= 0 {
            return 0;
        }
        let samples = (u64::from(duration_ms.unsigned_abs()) * u64::from(self.sample_rate) + 500) / 1000;
        usize::try_from(samples).unwrap_or(usize::MAX)
    }

    /// Synthesize a sine tone into an engine-owned buffer.
    ///
    /// Non-positive frequency or duration yields an empty buffer. Amplitude is
    /// clamped to `-i16::MAX..=i16::MAX`; a negative amplitude inverts the phase.
    pub fn synthesize(&self, frequency_hz: i32, duration_ms: i32, amplitude: i32) -> AudioBuffer {
        if frequency_hz <= 0 || duration_ms <= 0 || self.sample_rate == 0 {
            return AudioBuffer::empty();
        }

        let count = self.sample_count(duration_ms);
        let limit = i32::from(i16::MAX);
        let amplitude = amplitude.clamp(-limit, limit) as f32;
        let rate = u64::from(self.sample_rate);
        let step = frequency_hz as u64 * TABLE_SIZE as u64;
        let cycle = rate * TABLE_SIZE as u64;

        let mut phase = 0u64;
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            let degree = (phase / rate) as usize;
            let value = (SINE_TABLE.at(degree) * amplitude).round();
            samples.push(value.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16);
            phase = (phase + step) % cycle;
        }

        trace!(
            "Synthesized {} samples: {} Hz, {} ms, amplitude {}",
            count,
            frequency_hz,
            duration_ms,
            amplitude
        );

        AudioBuffer::from_samples(samples)
    }
}
