//! Audio output using cpal.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on its own thread for as
//! long as the sink exists. The engine side only touches the sample ring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chirp_core::{Error, Result, Timeout};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, Host, SampleFormat, SampleRate, Stream, StreamConfig,
};
use crossbeam_channel::{bounded, Sender};
use tracing::{debug, error, info, warn};

use crate::buffer::{shared_ring_buffer, RingBuffer, SharedRingBuffer};
use crate::sink::{deadline, AudioSink};

/// Samples buffered between the engine and the device callback.
const RING_CAPACITY: usize = 8192;

/// How often a blocked write or flush re-checks the ring.
const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Handle to the thread that owns the cpal stream.
struct StreamThread {
    shutdown: Sender<()>,
    thread: JoinHandle<()>,
    channels: u16,
}

/// Sink writing to a host output device through cpal.
pub struct CpalSink {
    /// Requested device, `None` for the host default.
    device_name: Option<String>,
    display_name: String,
    ring: SharedRingBuffer,
    failed: Arc<AtomicBool>,
    stream: Option<StreamThread>,
}

impl CpalSink {
    /// Sink for the host's default output device.
    pub fn default_device() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;
        let display_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {display_name}");
        Ok(Self::new(None, display_name))
    }

    /// Sink for the output device called `name`.
    pub fn with_device(name: &str) -> Result<Self> {
        let host = cpal::default_host();
        find_device(&host, Some(name))?;
        info!("Using audio output device: {name}");
        Ok(Self::new(Some(name.to_string()), name.to_string()))
    }

    fn new(device_name: Option<String>, display_name: String) -> Self {
        Self {
            device_name,
            display_name,
            ring: shared_ring_buffer(RING_CAPACITY),
            failed: Arc::new(AtomicBool::new(false)),
            stream: None,
        }
    }

    /// Output channels of the running stream; mono samples are copied to each.
    pub fn channels(&self) -> Option<u16> {
        self.stream.as_ref().map(|s| s.channels)
    }

    fn check_running(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(Error::AudioOutput("Output stream not started".to_string()));
        }
        if self.failed.load(Ordering::Acquire) {
            return Err(Error::AudioOutput("Output stream failed".to_string()));
        }
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(StreamThread {
            shutdown, thread, ..
        }) = self.stream.take()
        {
            drop(shutdown);
            if thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
        }
    }
}

impl AudioSink for CpalSink {
    fn configure(&mut self, sample_rate: u32) -> Result<()> {
        self.stop();
        self.ring.clear();
        self.failed.store(false, Ordering::Release);

        let (ready_tx, ready_rx) = bounded::<Result<u16>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let device_name = self.device_name.clone();
        let ring = Arc::clone(&self.ring);
        let failed = Arc::clone(&self.failed);

        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                match open_stream(device_name.as_deref(), sample_rate, ring, failed) {
                    Ok((stream, channels)) => {
                        let _ = ready_tx.send(Ok(channels));
                        // Park until the sink is dropped or reconfigured.
                        let _ = shutdown_rx.recv();
                        drop(stream);
                        debug!("Output stream closed");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {e}")))?;

        let channels = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Output thread exited during setup".to_string()))??;

        info!(
            "Output stream started on {}: {} Hz, {} channels",
            self.display_name, sample_rate, channels
        );
        self.stream = Some(StreamThread {
            shutdown: shutdown_tx,
            thread,
            channels,
        });
        Ok(())
    }

    fn write(&mut self, samples: &[i16], timeout: Timeout) -> Result<usize> {
        self.check_running()?;

        let deadline = deadline(timeout);
        let mut written = self.ring.write(samples);

        while written < samples.len() {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break;
            }
            thread::sleep(POLL_INTERVAL);
            self.check_running()?;
            written += self.ring.write(&samples[written..]);
        }

        Ok(written)
    }

    fn flush(&mut self, timeout: Timeout) -> Result<()> {
        let stall_limit = timeout.as_duration();
        let mut queued = self.ring.available();
        let mut last_progress = Instant::now();

        while queued > 0 {
            self.check_running()?;
            thread::sleep(POLL_INTERVAL);

            let now_queued = self.ring.available();
            if now_queued < queued {
                last_progress = Instant::now();
            } else if stall_limit.is_some_and(|limit| last_progress.elapsed() >= limit) {
                return Err(Error::AudioOutput(format!(
                    "Playback stalled with {now_queued} samples queued"
                )));
            }
            queued = now_queued;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.display_name
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn find_device(host: &Host, name: Option<&str>) -> Result<Device> {
    match name {
        None => host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string())),
        Some(name) => host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| Error::AudioOutput(format!("Output device not found: {name}"))),
    }
}

/// Preference among sample formats the callback can convert to.
const fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

fn open_stream(
    device_name: Option<&str>,
    sample_rate: u32,
    ring: SharedRingBuffer,
    failed: Arc<AtomicBool>,
) -> Result<(Stream, u16)> {
    let host = cpal::default_host();
    let device = find_device(&host, device_name)?;

    let supported = device
        .supported_output_configs()
        .map_err(|e| Error::AudioOutput(format!("Failed to get output configs: {e}")))?
        .filter(|range| {
            range.min_sample_rate().0 <= sample_rate && sample_rate <= range.max_sample_rate().0
        })
        .filter_map(|range| format_rank(range.sample_format()).map(|rank| (range, rank)))
        .min_by_key(|(range, rank)| (range.channels(), *rank))
        .map(|(range, _)| range.with_sample_rate(SampleRate(sample_rate)))
        .ok_or(Error::UnsupportedSampleRate(sample_rate))?;

    debug!("Selected output config: {:?}", supported);

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let stream = match sample_format {
        SampleFormat::I16 => build_stream::<i16>(&device, &config, ring, failed)?,
        SampleFormat::F32 => build_stream::<f32>(&device, &config, ring, failed)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, ring, failed)?,
        _ => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {sample_format:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

    Ok((stream, config.channels))
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<i16>>(
    device: &Device,
    config: &StreamConfig,
    ring: SharedRingBuffer,
    failed: Arc<AtomicBool>,
) -> Result<Stream> {
    let channels = usize::from(config.channels).max(1);
    let mut mono = vec![0i16; RING_CAPACITY];

    let err_fn = move |err| {
        error!("Audio stream error: {err}");
        failed.store(true, Ordering::Release);
    };

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                fill_frames(data, channels, &ring, &mut mono);
            },
            err_fn,
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))
}

/// Fill interleaved `data` from `ring`, copying each mono sample to every
/// channel of its frame.
///
/// At most `scratch.len()` frames come from the ring; frames past that, or
/// past what the ring holds, are silence. Never allocates.
fn fill_frames<T: cpal::Sample + cpal::FromSample<i16>>(
    data: &mut [T],
    channels: usize,
    ring: &RingBuffer,
    scratch: &mut [i16],
) {
    let frames = (data.len() / channels).min(scratch.len());
    let read = ring.read(&mut scratch[..frames]);

    for (i, frame) in data.chunks_mut(channels).enumerate() {
        let sample = if i < read { scratch[i] } else { 0 };
        for out in frame.iter_mut() {
            *out = T::from_sample(sample);
        }
    }
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok(devices)
}
