//! Scheduler tick timeouts.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A wait bound expressed in scheduler ticks.
///
/// `Ticks::ZERO` means "do not wait" and `Ticks::FOREVER` means "block until
/// the operation can proceed". Anything in between is converted to wall-clock
/// time with the engine's configured tick period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticks(u32);

impl Ticks {
    /// Do not block.
    pub const ZERO: Self = Self(0);
    /// Block indefinitely.
    pub const FOREVER: Self = Self(u32::MAX);

    pub const fn new(ticks: u32) -> Self {
        Self(ticks)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_forever(self) -> bool {
        self.0 == u32::MAX
    }

    /// Resolve this tick count into a concrete wait bound.
    pub const fn to_timeout(self, tick_period: Duration) -> Timeout {
        match self.0 {
            0 => Timeout::Immediate,
            u32::MAX => Timeout::Forever,
            n => Timeout::After(tick_period.saturating_mul(n)),
        }
    }
}

impl Default for Ticks {
    fn default() -> Self {
        Self::FOREVER
    }
}

impl From<u32> for Ticks {
    fn from(ticks: u32) -> Self {
        Self(ticks)
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_forever() {
            f.write_str("forever")
        } else {
            write!(f, "{} ticks", self.0)
        }
    }
}

/// A wait bound in wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Immediate,
    After(Duration),
    Forever,
}

impl Timeout {
    /// The bound as an optional duration, `None` meaning unbounded.
    pub const fn as_duration(self) -> Option<Duration> {
        match self {
            Self::Immediate => Some(Duration::ZERO),
            Self::After(d) => Some(d),
            Self::Forever => None,
        }
    }
}
