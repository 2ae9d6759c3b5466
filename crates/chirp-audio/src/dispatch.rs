//! Playback dispatcher: turns requests into sink writes.
//!
//! Requests reach the sink on one of two paths. Queued requests are drained
//! by the background loop in [`Dispatcher::run`]; modal requests are played on
//! the caller's thread by [`Dispatcher::play_modal`]. Both paths hold the sink
//! for a whole request, so a modal write never interleaves with the chunks of
//! a queued one.

use std::sync::Arc;
use std::time::Duration;

use chirp_core::{
    AudioBuffer, Error, Ownership, PlaybackRequest, QueueEntry, RequestId, Result, Ticks, Timeout,
};
use crossbeam_channel::Sender;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

use crate::ownership::OwnershipTracker;
use crate::queue::QueueConsumer;
use crate::sink::AudioSink;
use crate::synth::ToneSynth;
use crate::volume::Volume;

/// Events emitted as requests are played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The request took the sink.
    Started {
        id: RequestId,
        ownership: Ownership,
        samples: usize,
    },
    /// Every sample was written.
    Finished { id: RequestId, samples: usize },
    /// The sink failed or timed out; remaining samples were discarded.
    Aborted {
        id: RequestId,
        written: usize,
        reason: String,
    },
}

/// A request cut short by the sink.
struct Interrupted {
    written: usize,
    error: Error,
}

/// Sole owner of the sink. Shared between the engine and its worker thread.
pub(crate) struct Dispatcher {
    synth: ToneSynth,
    volume: Arc<Volume>,
    tracker: Arc<OwnershipTracker>,
    sink: Mutex<Box<dyn AudioSink>>,
    chunk_samples: usize,
    tick_period: Duration,
    sink_timeout: Ticks,
    events: Sender<PlaybackEvent>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        synth: ToneSynth,
        volume: Arc<Volume>,
        tracker: Arc<OwnershipTracker>,
        sink: Box<dyn AudioSink>,
        chunk_samples: usize,
        tick_period: Duration,
        sink_timeout: Ticks,
        events: Sender<PlaybackEvent>,
    ) -> Self {
        Self {
            synth,
            volume,
            tracker,
            sink: Mutex::new(sink),
            chunk_samples,
            tick_period,
            sink_timeout,
            events,
        }
    }

    /// Drain the queue until it is closed.
    pub(crate) fn run(&self, consumer: QueueConsumer) {
        info!("Playback dispatcher started");

        let mut scratch = vec![0i16; self.chunk_samples];
        let write_timeout = self.sink_timeout.to_timeout(self.tick_period);

        while let Some(entry) = consumer.dequeue(Ticks::FOREVER) {
            let mut sink = self.sink.lock();
            // Failures are already logged and reported as events.
            let _ = self.play(&mut **sink, entry, write_timeout, false, &mut scratch);
            // Hand the sink straight to a waiting modal caller, if any.
            MutexGuard::unlock_fair(sink);
        }

        info!("Request queue closed, dispatcher stopping");
    }

    /// Play one request on the calling thread and wait for the sink to drain.
    ///
    /// `acquire` bounds the wait for the sink to become free, `write` bounds
    /// each chunk write. Returns the number of samples played.
    pub(crate) fn play_modal(&self, entry: QueueEntry, acquire: Ticks, write: Ticks) -> Result<usize> {
        let guard = match acquire.to_timeout(self.tick_period) {
            Timeout::Immediate => self.sink.try_lock(),
            Timeout::After(wait) => self.sink.try_lock_for(wait),
            Timeout::Forever => Some(self.sink.lock()),
        };
        let Some(mut sink) = guard else {
            debug!("Modal request {} could not acquire the sink", entry.id);
            return Err(Error::SinkBusy { timeout: acquire });
        };

        let mut scratch = vec![0i16; self.chunk_samples];
        let result = self.play(
            &mut **sink,
            entry,
            write.to_timeout(self.tick_period),
            true,
            &mut scratch,
        );
        MutexGuard::unlock_fair(sink);
        result
    }

    /// Turn a request into the buffer that will be played.
    fn resolve(&self, request: PlaybackRequest) -> AudioBuffer {
        match request {
            PlaybackRequest::RawAudio { buffer, .. } => buffer,
            PlaybackRequest::Tone {
                frequency_hz,
                duration_ms,
                amplitude,
                ..
            } => self.synth.synthesize(frequency_hz, duration_ms, amplitude),
        }
    }

    fn play(
        &self,
        sink: &mut dyn AudioSink,
        entry: QueueEntry,
        write_timeout: Timeout,
        drain: bool,
        scratch: &mut [i16],
    ) -> Result<usize> {
        let QueueEntry { id, request } = entry;
        let kind = request.kind();
        let buffer = self.resolve(request);
        let total = buffer.len();
        let ownership = buffer.ownership();

        self.tracker.acquire(&buffer);
        debug!("Playing {kind} request {id}: {total} samples ({ownership:?})");
        self.emit(PlaybackEvent::Started {
            id,
            ownership,
            samples: total,
        });

        let mut outcome = self.stream(sink, &buffer, write_timeout, scratch);
        if drain {
            if let Ok(written) = outcome {
                if let Err(error) = sink.flush(write_timeout) {
                    outcome = Err(Interrupted { written, error });
                }
            }
        }

        // The sink is done with the samples, whether or not they all made it.
        self.tracker.release(buffer);

        match outcome {
            Ok(written) => {
                debug!("Request {id} finished");
                self.emit(PlaybackEvent::Finished {
                    id,
                    samples: written,
                });
                Ok(written)
            }
            Err(Interrupted { written, error }) => {
                warn!("Request {id} aborted after {written} of {total} samples: {error}");
                self.emit(PlaybackEvent::Aborted {
                    id,
                    written,
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    /// Scale and write `buffer` chunk by chunk.
    fn stream(
        &self,
        sink: &mut dyn AudioSink,
        buffer: &AudioBuffer,
        timeout: Timeout,
        scratch: &mut [i16],
    ) -> std::result::Result<usize, Interrupted> {
        let total = buffer.len();
        let mut written = 0;

        while written < total {
            let count = buffer.read_samples(written, scratch);
            let chunk = &mut scratch[..count];
            self.volume.apply(chunk);

            match sink.write(chunk, timeout) {
                Ok(accepted) if accepted >= count => {
                    written += count;
                    trace!("Wrote {count} samples to {} ({written}/{total})", sink.name());
                }
                Ok(accepted) => {
                    let written = written + accepted;
                    return Err(Interrupted {
                        written,
                        error: Error::SinkTimeout {
                            written,
                            requested: total,
                        },
                    });
                }
                Err(error) => return Err(Interrupted { written, error }),
            }
        }

        Ok(written)
    }

    fn emit(&self, event: PlaybackEvent) {
        if self.events.try_send(event).is_err() {
            trace!("Event channel full, dropping playback event");
        }
    }
}
