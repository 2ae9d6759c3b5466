//! Audio output engine coordinating the queue, dispatcher and sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chirp_core::{
    AudioBuffer, Beep, EngineConfig, Error, PlaybackRequest, QueueEntry, RequestId, Result, Ticks,
    BYTES_PER_SAMPLE,
};
use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, error, info};

use crate::dispatch::{Dispatcher, PlaybackEvent};
use crate::ownership::{BufferStats, OwnershipTracker};
use crate::queue::{request_queue, QueueProducer};
use crate::sink::AudioSink;
use crate::synth::ToneSynth;
use crate::volume::Volume;

/// Playback events kept for the application before new ones are dropped.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Queued PCM and tone playback on a single audio sink.
///
/// Non-modal requests are queued and played in admission order by a
/// background dispatcher thread. Modal requests skip the queue and play on the
/// caller's thread, returning once the sink has drained.
pub struct Speaker {
    config: EngineConfig,
    producer: QueueProducer,
    dispatcher: Arc<Dispatcher>,
    volume: Arc<Volume>,
    tracker: Arc<OwnershipTracker>,
    synth: ToneSynth,
    next_id: AtomicU64,
    event_rx: Receiver<PlaybackEvent>,
    worker: JoinHandle<()>,
}

impl Speaker {
    /// Configure `sink` at `config.sample_rate` and start the dispatcher.
    pub fn begin<S: AudioSink + 'static>(config: EngineConfig, mut sink: S) -> Result<Self> {
        config.validate()?;

        if let Err(e) = sink.configure(config.sample_rate) {
            error!(
                "Failed to configure audio sink '{}' at {} Hz: {e}",
                sink.name(),
                config.sample_rate
            );
            return Err(e);
        }
        info!(
            "Audio sink '{}' configured at {} Hz, queue capacity {}",
            sink.name(),
            config.sample_rate,
            config.queue_capacity
        );

        let (producer, consumer) = request_queue(config.queue_capacity, config.tick_period());
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);

        let volume = Arc::new(Volume::new(i32::from(config.default_volume)));
        let tracker = Arc::new(OwnershipTracker::new());
        let synth = ToneSynth::new(config.sample_rate);

        let dispatcher = Arc::new(Dispatcher::new(
            synth,
            Arc::clone(&volume),
            Arc::clone(&tracker),
            Box::new(sink),
            config.chunk_samples,
            config.tick_period(),
            config.sink_timeout,
            event_tx,
        ));

        let worker_dispatcher = Arc::clone(&dispatcher);
        let worker = std::thread::Builder::new()
            .name("audio-dispatch".to_string())
            .spawn(move || worker_dispatcher.run(consumer))
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn dispatcher thread: {e}")))?;

        Ok(Self {
            config,
            producer,
            dispatcher,
            volume,
            tracker,
            synth,
            next_id: AtomicU64::new(1),
            event_rx,
            worker,
        })
    }

    /// Start the engine on the host's default output device.
    #[cfg(feature = "cpal-output")]
    pub fn begin_default_output(config: EngineConfig) -> Result<Self> {
        let sink = crate::output::CpalSink::default_device()?;
        Self::begin(config, sink)
    }

    /// Play 16-bit little-endian PCM.
    ///
    /// Returns the number of bytes accepted, or 0 if the request was not
    /// admitted (queue full past `timeout`, invalid buffer, sink busy or
    /// failed on the modal path).
    pub fn play_raw(&self, buffer: AudioBuffer, modal: bool, timeout: Ticks) -> usize {
        self.try_play_raw(buffer, modal, timeout)
            .unwrap_or_else(|e| {
                debug!("Raw playback not accepted: {e}");
                0
            })
    }

    /// Like [`Speaker::play_raw`], reporting why a request was refused.
    pub fn try_play_raw(&self, buffer: AudioBuffer, modal: bool, timeout: Ticks) -> Result<usize> {
        let bytes = buffer.len_bytes();
        if buffer.is_empty() {
            return Err(Error::InvalidArgument("empty PCM buffer".to_string()));
        }
        if bytes % BYTES_PER_SAMPLE != 0 {
            return Err(Error::InvalidArgument(format!(
                "PCM length {bytes} is not a whole number of 16-bit samples"
            )));
        }

        let entry = self.entry(PlaybackRequest::raw(buffer, modal));
        if modal {
            let samples = self.dispatcher.play_modal(entry, timeout, timeout)?;
            Ok(samples * BYTES_PER_SAMPLE)
        } else {
            self.producer.enqueue(entry, timeout)?;
            Ok(bytes)
        }
    }

    /// Play a sine tone.
    ///
    /// Returns the number of samples the tone occupies, or 0 if it was not
    /// admitted. Tones with a non-positive frequency or duration, or longer
    /// than `max_tone_samples`, are never admitted.
    pub fn play_beep(&self, frequency: i32, duration_ms: i32, amplitude: i32, modal: bool) -> usize {
        self.play_tone(Beep {
            frequency,
            duration_ms,
            amplitude,
            modal,
        })
    }

    /// [`Speaker::play_beep`] taking its parameters as one record.
    pub fn play_tone(&self, beep: Beep) -> usize {
        self.try_play_tone(beep).unwrap_or_else(|e| {
            debug!("Tone not accepted: {e}");
            0
        })
    }

    /// Like [`Speaker::play_tone`], reporting why a request was refused.
    pub fn try_play_tone(&self, beep: Beep) -> Result<usize> {
        let samples = self.synth.sample_count(beep.duration_ms);
        if beep.frequency <= 0 || samples == 0 {
            return Err(Error::InvalidArgument(format!(
                "degenerate tone: {} Hz for {} ms",
                beep.frequency, beep.duration_ms
            )));
        }
        if samples > self.config.max_tone_samples {
            return Err(Error::InvalidArgument(format!(
                "tone of {} ms needs {samples} samples, limit is {}",
                beep.duration_ms, self.config.max_tone_samples
            )));
        }

        let entry = self.entry(PlaybackRequest::from(beep));
        if beep.modal {
            self.dispatcher.play_modal(
                entry,
                self.config.enqueue_timeout,
                self.config.sink_timeout,
            )
        } else {
            self.producer.enqueue(entry, self.config.enqueue_timeout)?;
            Ok(samples)
        }
    }

    /// Set the output volume, clamping into `0..=100`.
    pub fn set_volume(&self, level: i32) {
        self.volume.set(level);
    }

    pub fn volume(&self) -> u8 {
        self.volume.level()
    }

    /// Requests waiting in the queue.
    pub fn pending(&self) -> usize {
        self.producer.len()
    }

    pub const fn queue_capacity(&self) -> usize {
        self.producer.capacity()
    }

    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Buffer ownership accounting so far.
    pub fn stats(&self) -> BufferStats {
        self.tracker.stats()
    }

    /// Try to receive a playback event without blocking.
    pub fn try_recv_event(&self) -> Option<PlaybackEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next playback event.
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<PlaybackEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stop accepting requests, let the dispatcher finish the queue, and wait
    /// for it to exit.
    pub fn shutdown(self) -> Result<()> {
        let Self {
            producer, worker, ..
        } = self;
        drop(producer);

        worker
            .join()
            .map_err(|_| Error::Internal("dispatcher thread panicked".to_string()))?;
        info!("Audio engine shut down");
        Ok(())
    }

    fn entry(&self, request: PlaybackRequest) -> QueueEntry {
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        QueueEntry::new(id, request)
    }
}
