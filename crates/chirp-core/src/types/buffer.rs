//! PCM playback buffers and their ownership.

use std::fmt;
use std::sync::Arc;

/// Size of one mono 16-bit PCM sample in bytes.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Who is responsible for releasing a buffer's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The caller keeps the memory; the engine only drops its own handle.
    CallerOwned,
    /// The engine releases the memory once playback finishes or aborts.
    EngineOwned,
}

enum Storage {
    /// Little-endian PCM shared with the caller.
    Shared(Arc<[u8]>),
    /// Little-endian PCM handed over to the engine.
    Pcm(Vec<u8>),
    /// Samples produced by the tone synthesizer.
    Samples(Vec<i16>),
}

/// A contiguous run of mono 16-bit PCM samples.
///
/// The ownership tag is derived from how the memory is held, so it can never
/// disagree with who actually frees it. Not `Clone`: an engine-owned buffer
/// has exactly one holder.
pub struct AudioBuffer {
    storage: Storage,
}

impl AudioBuffer {
    /// Wrap little-endian PCM bytes the caller keeps a handle to.
    pub const fn caller_owned(pcm: Arc<[u8]>) -> Self {
        Self {
            storage: Storage::Shared(pcm),
        }
    }

    /// Take ownership of little-endian PCM bytes.
    pub const fn engine_owned(pcm: Vec<u8>) -> Self {
        Self {
            storage: Storage::Pcm(pcm),
        }
    }

    /// Take ownership of already-decoded samples.
    pub const fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            storage: Storage::Samples(samples),
        }
    }

    /// An engine-owned buffer with no samples.
    pub const fn empty() -> Self {
        Self::from_samples(Vec::new())
    }

    pub const fn ownership(&self) -> Ownership {
        match self.storage {
            Storage::Shared(_) => Ownership::CallerOwned,
            Storage::Pcm(_) | Storage::Samples(_) => Ownership::EngineOwned,
        }
    }

    /// Length of the buffer in bytes as supplied.
    pub fn len_bytes(&self) -> usize {
        match &self.storage {
            Storage::Shared(pcm) => pcm.len(),
            Storage::Pcm(pcm) => pcm.len(),
            Storage::Samples(samples) => samples.len() * BYTES_PER_SAMPLE,
        }
    }

    /// Number of whole samples. A trailing odd byte is not a sample.
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Shared(pcm) => pcm.len() / BYTES_PER_SAMPLE,
            Storage::Pcm(pcm) => pcm.len() / BYTES_PER_SAMPLE,
            Storage::Samples(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy samples starting at `offset` into `out`.
    ///
    /// Returns the number of samples copied.
    pub fn read_samples(&self, offset: usize, out: &mut [i16]) -> usize {
        let available = self.len().saturating_sub(offset);
        let count = out.len().min(available);
        if count == 0 {
            return 0;
        }

        match &self.storage {
            Storage::Shared(pcm) => decode_le(pcm, offset, &mut out[..count]),
            Storage::Pcm(pcm) => decode_le(pcm, offset, &mut out[..count]),
            Storage::Samples(samples) => {
                out[..count].copy_from_slice(&samples[offset..offset + count]);
            }
        }

        count
    }

    /// Collect every sample into a new vector.
    pub fn to_samples(&self) -> Vec<i16> {
        let mut out = vec![0i16; self.len()];
        self.read_samples(0, &mut out);
        out
    }
}

fn decode_le(pcm: &[u8], offset: usize, out: &mut [i16]) {
    let start = offset * BYTES_PER_SAMPLE;
    let bytes = &pcm[start..start + out.len() * BYTES_PER_SAMPLE];
    for (sample, pair) in out.iter_mut().zip(bytes.chunks_exact(BYTES_PER_SAMPLE)) {
        *sample = i16::from_le_bytes([pair[0], pair[1]]);
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("ownership", &self.ownership())
            .field("samples", &self.len())
            .finish()
    }
}
