//! Engine configuration.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Ticks, Timeout};

/// Highest accepted volume level.
pub const MAX_VOLUME: u8 = 100;

/// Ten seconds at 44.1 kHz.
pub const DEFAULT_MAX_TONE_SAMPLES: usize = 441_000;

/// Configuration of the audio output engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Maximum number of queued asynchronous requests.
    pub queue_capacity: usize,
    /// Samples written to the sink per write call.
    pub chunk_samples: usize,
    /// Volume level (0-100) at startup.
    pub default_volume: u8,
    /// Length of one scheduler tick in microseconds.
    pub tick_period_us: u64,
    /// Bound on a single sink write from the dispatcher.
    pub sink_timeout: Ticks,
    /// Admission timeout used by `play_beep`.
    pub enqueue_timeout: Ticks,
    /// Longest tone, in samples, that is synthesized. Longer tones are refused.
    pub max_tone_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            queue_capacity: 16,
            chunk_samples: 256,
            default_volume: MAX_VOLUME,
            tick_period_us: 1_000,
            sink_timeout: Ticks::new(1_000),
            enqueue_timeout: Ticks::FOREVER,
            max_tone_samples: DEFAULT_MAX_TONE_SAMPLES,
        }
    }
}

impl EngineConfig {
    /// Default configuration at a specific sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::UnsupportedSampleRate(0));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.chunk_samples == 0 {
            return Err(Error::InvalidConfig(
                "chunk_samples must be at least 1".to_string(),
            ));
        }
        if self.tick_period_us == 0 {
            return Err(Error::InvalidConfig(
                "tick_period_us must be at least 1".to_string(),
            ));
        }
        if self.max_tone_samples == 0 {
            return Err(Error::InvalidConfig(
                "max_tone_samples must be at least 1".to_string(),
            ));
        }
        if self.default_volume > MAX_VOLUME {
            return Err(Error::InvalidConfig(format!(
                "default_volume {} exceeds {MAX_VOLUME}",
                self.default_volume
            )));
        }
        Ok(())
    }

    pub const fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }

    /// Resolve a tick count using this configuration's tick period.
    pub const fn timeout(&self, ticks: Ticks) -> Timeout {
        ticks.to_timeout(self.tick_period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.default_volume, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{"sample_rate": 16000, "queue_capacity": 4}"#).unwrap();
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.queue_capacity, 4);
        assert_eq!(config.chunk_samples, 256);
        assert_eq!(config.enqueue_timeout, Ticks::FOREVER);
        assert_eq!(config.max_tone_samples, DEFAULT_MAX_TONE_SAMPLES);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"queue_capacity": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"sample_rate": 0}"#),
            Err(Error::UnsupportedSampleRate(0))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"max_tone_samples": 0}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_timeout_uses_tick_period() {
        let config = EngineConfig {
            tick_period_us: 10_000,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.timeout(Ticks::new(3)),
            Timeout::After(Duration::from_millis(30))
        );
    }
}
