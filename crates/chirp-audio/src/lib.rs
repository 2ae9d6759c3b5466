//! # chirp-audio
//!
//! Queued audio output engine for a single PCM sink.
//!
//! Features:
//! - Bounded FIFO of playback requests with tick timeouts
//! - Table-driven sine tone synthesis
//! - Blocking (modal) and fire-and-forget playback
//! - Explicit buffer ownership, released in exactly one place
//! - Low-latency cpal output (feature `cpal-output`)

pub mod buffer;
pub mod dispatch;
pub mod engine;
#[cfg(feature = "cpal-output")]
pub mod output;
pub mod ownership;
pub mod queue;
pub mod sink;
pub mod synth;
pub mod table;
pub mod volume;

pub use dispatch::PlaybackEvent;
pub use engine::Speaker;
pub use ownership::{BufferStats, OwnershipTracker};
pub use queue::{request_queue, QueueConsumer, QueueProducer};
pub use sink::{AudioSink, CaptureSink};
pub use synth::ToneSynth;
pub use volume::Volume;

#[cfg(feature = "cpal-output")]
pub use output::CpalSink;
