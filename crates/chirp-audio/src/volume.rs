//! Output volume control.

use std::sync::atomic::{AtomicU8, Ordering};

use chirp_core::config::MAX_VOLUME;
use tracing::debug;

/// Scalar gain (0-100) applied to every sample before it reaches the sink.
#[derive(Debug)]
pub struct Volume {
    level: AtomicU8,
}

impl Volume {
    /// Create a volume control, clamping `level` into `0..=100`.
    pub fn new(level: i32) -> Self {
        Self {
            level: AtomicU8::new(clamp_level(level)),
        }
    }

    /// Store a new level, clamping out-of-range input. Returns the stored level.
    pub fn set(&self, level: i32) -> u8 {
        let clamped = clamp_level(level);
        let old = self.level.swap(clamped, Ordering::Relaxed);
        if old != clamped {
            debug!("Volume changed: {old} -> {clamped}");
        }
        clamped
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    /// Scale one sample at the current level.
    pub fn scale(&self, sample: i16) -> i16 {
        scale_sample(sample, self.level())
    }

    /// Scale a chunk in place. The level is read once for the whole chunk.
    pub fn apply(&self, samples: &mut [i16]) {
        let level = self.level();
        if level == MAX_VOLUME {
            return;
        }
        for sample in samples.iter_mut() {
            *sample = scale_sample(*sample, level);
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(i32::from(MAX_VOLUME))
    }
}

/// `sample * level / 100`, truncating toward zero.
///
/// The result never exceeds the input in magnitude, so scaling cannot clip.
#[inline]
pub const fn scale_sample(sample: i16, level: u8) -> i16 {
    ((sample as i32 * level as i32) / MAX_VOLUME as i32) as i16
}

fn clamp_level(level: i32) -> u8 {
    level.clamp(0, i32::from(MAX_VOLUME)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamps_out_of_range() {
        let volume = Volume::default();
        assert_eq!(volume.set(150), 100);
        assert_eq!(volume.level(), 100);
        assert_eq!(volume.set(-5), 0);
        assert_eq!(volume.level(), 0);
    }

    #[test]
    fn test_over_range_matches_full() {
        let over = Volume::new(150);
        let full = Volume::new(100);
        let under = Volume::new(-5);
        let mute = Volume::new(0);
        for sample in [i16::MIN, -12_345, -1, 0, 1, 9_999, i16::MAX] {
            assert_eq!(over.scale(sample), full.scale(sample));
            assert_eq!(under.scale(sample), mute.scale(sample));
        }
    }

    #[test]
    fn test_half_volume() {
        let volume = Volume::new(50);
        let mut samples = [10_000i16, -10_000, 3, -3, i16::MIN];
        volume.apply(&mut samples);
        assert_eq!(samples, [5000, -5000, 1, -1, -16_384]);
    }

    #[test]
    fn test_full_volume_is_identity() {
        let volume = Volume::default();
        let mut samples = [i16::MIN, -1, 0, 1, i16::MAX];
        volume.apply(&mut samples);
        assert_eq!(samples, [i16::MIN, -1, 0, 1, i16::MAX]);
    }

    proptest! {
        #[test]
        fn prop_monotonic(sample in any::<i16>(), a in 0u8..=100, b in 0u8..=100) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            let quiet = i32::from(scale_sample(sample, low)).abs();
            let loud = i32::from(scale_sample(sample, high)).abs();
            prop_assert!(quiet <= loud);
            prop_assert!(loud <= i32::from(sample).abs());
        }
    }
}
