//! Core domain types for chirp.

pub mod buffer;
pub mod request;
pub mod ticks;

pub use buffer::{AudioBuffer, Ownership, BYTES_PER_SAMPLE};
pub use request::{Beep, PlaybackRequest, QueueEntry, RequestId};
pub use ticks::{Ticks, Timeout};
