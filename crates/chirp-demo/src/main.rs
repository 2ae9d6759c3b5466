//! # chirp-demo
//!
//! Plays alert tones and a short PCM clip through the chirp engine on the
//! host's default output device. Pass a JSON engine config path as the first
//! argument to override the defaults, and set `CHIRP_DEVICE` to pick another
//! output device by name.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chirp_audio::{output, CpalSink, PlaybackEvent, Speaker};
use chirp_core::{AudioBuffer, Beep, EngineConfig, Ticks};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Notes of the queued arpeggio, in Hz.
const ARPEGGIO: [i32; 4] = [523, 659, 784, 1047];

fn start_speaker(config: EngineConfig) -> Result<Speaker> {
    match output::list_output_devices() {
        Ok(devices) => debug!("Output devices: {}", devices.join(", ")),
        Err(e) => warn!("Could not list output devices: {e}"),
    }

    let speaker = match std::env::var("CHIRP_DEVICE") {
        Ok(name) => Speaker::begin(config, CpalSink::with_device(&name)?)?,
        Err(_) => Speaker::begin_default_output(config)?,
    };
    Ok(speaker)
}

fn load_config() -> Result<EngineConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(EngineConfig::default());
    };
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {path}"))?;
    EngineConfig::from_json_str(&json).with_context(|| format!("Invalid config file {path}"))
}

/// Little-endian 16-bit square wave.
fn square_wave(sample_rate: u32, frequency: u32, duration_ms: u32, amplitude: i16) -> Vec<u8> {
    let count = (u64::from(sample_rate) * u64::from(duration_ms) / 1000) as usize;
    let half_period = (sample_rate / frequency.max(1) / 2).max(1) as usize;
    (0..count)
        .flat_map(|i| {
            let sample = if (i / half_period) % 2 == 0 {
                amplitude
            } else {
                -amplitude
            };
            sample.to_le_bytes()
        })
        .collect()
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_demo=debug,chirp_audio=info".into()),
        )
        .init();

    info!("Starting chirp demo v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let speaker = start_speaker(config).context("Failed to start audio engine")?;

    // Blocks until the tone has left the speaker.
    let played = speaker.play_tone(Beep {
        modal: true,
        ..Beep::default()
    });
    info!("Modal beep played {played} samples");

    speaker.set_volume(60);
    let mut queued = 0;
    for frequency in ARPEGGIO {
        if speaker.play_beep(frequency, 150, 12_000, false) > 0 {
            queued += 1;
        }
    }

    // The clip stays ours; the engine only borrows a handle while playing it.
    let clip: Arc<[u8]> = Arc::from(square_wave(speaker.sample_rate(), 440, 300, 6_000));
    for _ in 0..2 {
        let bytes = speaker.play_raw(
            AudioBuffer::caller_owned(Arc::clone(&clip)),
            false,
            Ticks::new(500),
        );
        if bytes > 0 {
            queued += 1;
        }
    }
    info!("Queued {queued} requests ({} pending)", speaker.pending());

    let mut done = 0;
    while done < queued {
        match speaker.recv_event_timeout(Duration::from_secs(5)) {
            Some(PlaybackEvent::Finished { id, samples }) => {
                info!("Request {id} finished ({samples} samples)");
                done += 1;
            }
            Some(PlaybackEvent::Aborted { id, reason, .. }) => {
                warn!("Request {id} aborted: {reason}");
                done += 1;
            }
            Some(PlaybackEvent::Started { .. }) => {}
            None => {
                warn!("Timed out waiting for playback");
                break;
            }
        }
    }

    let stats = speaker.stats();
    info!(
        "Buffers: {} engine-owned freed, {} caller-owned returned",
        stats.engine_released, stats.caller_returned
    );

    speaker.shutdown()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_wave_shape() {
        let pcm = square_wave(8000, 1000, 2, 100);
        assert_eq!(pcm.len(), 16 * 2);
        let first = i16::from_le_bytes([pcm[0], pcm[1]]);
        let fifth = i16::from_le_bytes([pcm[8], pcm[9]]);
        assert_eq!(first, 100);
        assert_eq!(fifth, -100);
    }
}
