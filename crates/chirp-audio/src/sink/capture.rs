//! In-memory sink that records every accepted sample.
//!
//! Used on headless hosts and in tests. Clones share the same recording, so a
//! handle kept outside the engine can inspect what the engine wrote. Writes can
//! be held back with [`CaptureSink::pause`] and faults injected one at a time.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chirp_core::{Error, Result, Timeout};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::{deadline, AudioSink};

/// A one-shot failure applied to the next write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkFault {
    /// The write fails with an output error.
    Error(String),
    /// The write accepts nothing, as if its timeout elapsed.
    Stall,
    /// The write accepts only this many samples.
    Partial(usize),
}

#[derive(Default)]
struct State {
    supported_rates: Option<Vec<u32>>,
    sample_rate: Option<u32>,
    samples: Vec<i16>,
    writes: usize,
    flushes: usize,
    paused: bool,
    blocked_writers: usize,
    faults: VecDeque<SinkFault>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

/// Sink that captures samples in memory.
#[derive(Clone, Default)]
pub struct CaptureSink {
    shared: Arc<Shared>,
}

impl CaptureSink {
    /// A sink accepting any sample rate.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that only accepts the listed sample rates.
    pub fn with_supported_rates(rates: &[u32]) -> Self {
        let sink = Self::new();
        sink.lock().supported_rates = Some(rates.to_vec());
        sink
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock()
    }

    /// Every sample accepted so far, in write order.
    pub fn samples(&self) -> Vec<i16> {
        self.lock().samples.clone()
    }

    /// Rate passed to `configure`, if it succeeded.
    pub fn sample_rate(&self) -> Option<u32> {
        self.lock().sample_rate
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    /// Hold back all writes until [`CaptureSink::resume`].
    pub fn pause(&self) {
        self.lock().paused = true;
    }

    pub fn resume(&self) {
        self.lock().paused = false;
        self.shared.changed.notify_all();
    }

    /// Queue a fault for a future write. Faults apply in the order injected.
    pub fn inject(&self, fault: SinkFault) {
        self.lock().faults.push_back(fault);
    }

    /// Wait until a writer is blocked on a paused sink.
    pub fn wait_for_blocked_writer(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.blocked_writers > 0)
    }

    /// Wait until at least `count` samples have been captured.
    pub fn wait_for_samples(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.samples.len() >= count)
    }

    fn wait_until(&self, timeout: Duration, ready: impl Fn(&State) -> bool) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.lock();
        while !ready(&state) {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .changed
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return ready(&state);
                    }
                }
                None => self.shared.changed.wait(&mut state),
            }
        }
        true
    }
}

impl AudioSink for CaptureSink {
    fn configure(&mut self, sample_rate: u32) -> Result<()> {
        let mut state = self.lock();
        if let Some(rates) = &state.supported_rates {
            if !rates.contains(&sample_rate) {
                return Err(Error::UnsupportedSampleRate(sample_rate));
            }
        }
        state.sample_rate = Some(sample_rate);
        Ok(())
    }

    fn write(&mut self, samples: &[i16], timeout: Timeout) -> Result<usize> {
        let mut state = self.lock();

        if let Some(fault) = state.faults.pop_front() {
            match fault {
                SinkFault::Error(message) => return Err(Error::AudioOutput(message)),
                SinkFault::Stall => return Ok(0),
                SinkFault::Partial(count) => {
                    let count = count.min(samples.len());
                    state.samples.extend_from_slice(&samples[..count]);
                    self.shared.changed.notify_all();
                    return Ok(count);
                }
            }
        }

        if state.paused {
            let deadline = deadline(timeout);
            state.blocked_writers += 1;
            self.shared.changed.notify_all();

            while state.paused {
                let timed_out = match deadline {
                    Some(deadline) => self
                        .shared
                        .changed
                        .wait_until(&mut state, deadline)
                        .timed_out(),
                    None => {
                        self.shared.changed.wait(&mut state);
                        false
                    }
                };
                if timed_out && state.paused {
                    state.blocked_writers -= 1;
                    return Ok(0);
                }
            }
            state.blocked_writers -= 1;
        }

        state.samples.extend_from_slice(samples);
        state.writes += 1;
        self.shared.changed.notify_all();
        Ok(samples.len())
    }

    fn flush(&mut self, _timeout: Timeout) -> Result<()> {
        self.lock().flushes += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_records_writes_across_clones() {
        let observer = CaptureSink::new();
        let mut sink = observer.clone();

        sink.configure(8000).unwrap();
        assert_eq!(sink.write(&[1, 2, 3], Timeout::Forever).unwrap(), 3);
        assert_eq!(sink.write(&[4], Timeout::Immediate).unwrap(), 1);

        assert_eq!(observer.sample_rate(), Some(8000));
        assert_eq!(observer.samples(), vec![1, 2, 3, 4]);
        assert_eq!(observer.write_count(), 2);
    }

    #[test]
    fn test_rejects_unsupported_rate() {
        let mut sink = CaptureSink::with_supported_rates(&[16_000, 44_100]);
        assert!(matches!(
            sink.configure(22_050),
            Err(Error::UnsupportedSampleRate(22_050))
        ));
        assert_eq!(sink.sample_rate(), None);
        assert!(sink.configure(44_100).is_ok());
    }

    #[test]
    fn test_faults_apply_in_order() {
        let mut sink = CaptureSink::new();
        sink.inject(SinkFault::Partial(2));
        sink.inject(SinkFault::Stall);
        sink.inject(SinkFault::Error("bus".into()));

        assert_eq!(sink.write(&[1, 2, 3], Timeout::Forever).unwrap(), 2);
        assert_eq!(sink.write(&[4, 5], Timeout::Forever).unwrap(), 0);
        assert!(matches!(
            sink.write(&[6], Timeout::Forever),
            Err(Error::AudioOutput(_))
        ));
        assert_eq!(sink.write(&[7], Timeout::Forever).unwrap(), 1);
        assert_eq!(sink.samples(), vec![1, 2, 7]);
    }

    #[test]
    fn test_paused_write_times_out() {
        let mut sink = CaptureSink::new();
        sink.pause();
        let accepted = sink
            .write(&[1, 2], Timeout::After(Duration::from_millis(10)))
            .unwrap();
        assert_eq!(accepted, 0);
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn test_paused_write_with_unrepresentable_timeout() {
        let observer = CaptureSink::new();
        let mut sink = observer.clone();
        observer.pause();

        let writer = thread::spawn(move || sink.write(&[3, 4], Timeout::After(Duration::MAX)));
        assert!(observer.wait_for_blocked_writer(Duration::MAX));
        observer.resume();

        assert_eq!(writer.join().unwrap().unwrap(), 2);
        assert_eq!(observer.samples(), vec![3, 4]);
    }

    #[test]
    fn test_paused_write_resumes() {
        let observer = CaptureSink::new();
        let mut sink = observer.clone();
        observer.pause();

        let writer = thread::spawn(move || sink.write(&[9, 9], Timeout::Forever));
        assert!(observer.wait_for_blocked_writer(Duration::from_secs(5)));
        observer.resume();

        assert_eq!(writer.join().unwrap().unwrap(), 2);
        assert_eq!(observer.samples(), vec![9, 9]);
    }
}
