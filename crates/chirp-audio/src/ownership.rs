//! Buffer ownership tracking.
//!
//! Every buffer that reaches the sink passes through [`OwnershipTracker::acquire`]
//! before playback and [`OwnershipTracker::release`] afterwards. `release`
//! takes the buffer by value, so a buffer cannot be released twice.

use std::sync::atomic::{AtomicU64, Ordering};

use chirp_core::{AudioBuffer, Ownership};
use tracing::trace;

/// Snapshot of buffer accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Engine-owned buffers taken into playback.
    pub engine_acquired: u64,
    /// Engine-owned buffers freed.
    pub engine_released: u64,
    /// Caller-owned buffers taken into playback.
    pub caller_acquired: u64,
    /// Caller-owned buffers handed back (engine handle dropped, memory kept).
    pub caller_returned: u64,
}

impl BufferStats {
    /// Engine-owned buffers currently held.
    pub const fn engine_outstanding(&self) -> u64 {
        self.engine_acquired.saturating_sub(self.engine_released)
    }

    /// Caller-owned buffers currently held.
    pub const fn caller_outstanding(&self) -> u64 {
        self.caller_acquired.saturating_sub(self.caller_returned)
    }
}

/// Records buffer ownership and performs the release.
#[derive(Debug, Default)]
pub struct OwnershipTracker {
    engine_acquired: AtomicU64,
    engine_released: AtomicU64,
    caller_acquired: AtomicU64,
    caller_returned: AtomicU64,
}

impl OwnershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `buffer` is about to be played.
    pub fn acquire(&self, buffer: &AudioBuffer) {
        let counter = match buffer.ownership() {
            Ownership::EngineOwned => &self.engine_acquired,
            Ownership::CallerOwned => &self.caller_acquired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Give up the engine's hold on `buffer`.
    ///
    /// Engine-owned memory is freed here. For caller-owned buffers only the
    /// engine's handle is dropped; the caller's memory stays valid.
    pub fn release(&self, buffer: AudioBuffer) -> Ownership {
        let ownership = buffer.ownership();
        let samples = buffer.len();
        drop(buffer);

        match ownership {
            Ownership::EngineOwned => {
                self.engine_released.fetch_add(1, Ordering::Relaxed);
                trace!("Freed engine-owned buffer ({samples} samples)");
            }
            Ownership::CallerOwned => {
                self.caller_returned.fetch_add(1, Ordering::Relaxed);
                trace!("Returned caller-owned buffer ({samples} samples)");
            }
        }
        ownership
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            engine_acquired: self.engine_acquired.load(Ordering::Relaxed),
            engine_released: self.engine_released.load(Ordering::Relaxed),
            caller_acquired: self.caller_acquired.load(Ordering::Relaxed),
            caller_returned: self.caller_returned.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_engine_owned_released_once() {
        let tracker = OwnershipTracker::new();
        let buffer = AudioBuffer::from_samples(vec![1, 2, 3]);

        tracker.acquire(&buffer);
        assert_eq!(tracker.stats().engine_outstanding(), 1);

        assert_eq!(tracker.release(buffer), Ownership::EngineOwned);
        let stats = tracker.stats();
        assert_eq!(stats.engine_acquired, 1);
        assert_eq!(stats.engine_released, 1);
        assert_eq!(stats.engine_outstanding(), 0);
        assert_eq!(stats.caller_acquired, 0);
    }

    #[test]
    fn test_caller_owned_memory_survives_release() {
        let tracker = OwnershipTracker::new();
        let pcm: Arc<[u8]> = Arc::from(vec![1u8, 0, 2, 0]);
        let buffer = AudioBuffer::caller_owned(Arc::clone(&pcm));

        tracker.acquire(&buffer);
        assert_eq!(tracker.release(buffer), Ownership::CallerOwned);

        assert_eq!(Arc::strong_count(&pcm), 1);
        assert_eq!(&pcm[..], &[1, 0, 2, 0]);

        let stats = tracker.stats();
        assert_eq!(stats.caller_acquired, 1);
        assert_eq!(stats.caller_returned, 1);
        assert_eq!(stats.engine_released, 0);
    }
}
