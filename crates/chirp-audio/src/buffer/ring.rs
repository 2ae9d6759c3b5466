//! Lock-free sample ring for feeding a device callback.
//!
//! Single producer (the engine writing PCM) and single consumer (the output
//! callback). Slots are atomics, so neither side ever blocks the other.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::atomic::{AtomicI16, AtomicUsize, Ordering};
use std::sync::Arc;

/// Single-producer, single-consumer ring of 16-bit samples.
pub struct RingBuffer {
    slots: Box<[AtomicI16]>,
    /// Total samples ever read.
    read_pos: AtomicUsize,
    /// Total samples ever written.
    write_pos: AtomicUsize,
    /// `capacity - 1`; capacity is always a power of two.
    mask: usize,
}

impl RingBuffer {
    /// Create a ring buffer; capacity is rounded up to the next power of 2.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        let slots = (0..capacity).map(|_| AtomicI16::new(0)).collect();

        Self {
            slots,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
            mask: capacity - 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Samples waiting to be read.
    pub fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Slots free for writing.
    pub fn free(&self) -> usize {
        self.capacity() - self.available()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free() == 0
    }

    /// Write as many samples as fit. Producer side only.
    ///
    /// Returns the number written.
    pub fn write(&self, samples: &[i16]) -> usize {
        let write_pos = self.write_pos.load(Ordering::Relaxed);
        let read_pos = self.read_pos.load(Ordering::Acquire);

        let space = self.capacity() - write_pos.wrapping_sub(read_pos);
        let count = samples.len().min(space);

        for (i, &sample) in samples[..count].iter().enumerate() {
            self.slots[write_pos.wrapping_add(i) & self.mask].store(sample, Ordering::Relaxed);
        }

        self.write_pos
            .store(write_pos.wrapping_add(count), Ordering::Release);
        count
    }

    /// Read up to `output.len()` samples. Consumer side only.
    ///
    /// Returns the number read.
    pub fn read(&self, output: &mut [i16]) -> usize {
        let read_pos = self.read_pos.load(Ordering::Relaxed);
        let write_pos = self.write_pos.load(Ordering::Acquire);

        let count = output.len().min(write_pos.wrapping_sub(read_pos));

        for (i, sample) in output[..count].iter_mut().enumerate() {
            *sample = self.slots[read_pos.wrapping_add(i) & self.mask].load(Ordering::Relaxed);
        }

        self.read_pos
            .store(read_pos.wrapping_add(count), Ordering::Release);
        count
    }

    /// Discard everything not yet read. Consumer side only.
    pub fn clear(&self) {
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }
}

/// Ring shared between a sink and its device callback.
pub type SharedRingBuffer = Arc<RingBuffer>;

/// Allocate a ring of at least `capacity` samples behind an `Arc`.
pub fn shared_ring_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(RingBuffer::new(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_write_read() {
        let ring = RingBuffer::new(1024);

        let samples = [1i16, -2, 3, -4, 5];
        assert_eq!(ring.write(&samples), 5);
        assert_eq!(ring.available(), 5);

        let mut output = [0i16; 5];
        assert_eq!(ring.read(&mut output), 5);
        assert_eq!(output, samples);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_capacity_rounds_up() {
        assert_eq!(RingBuffer::new(1000).capacity(), 1024);
        assert_eq!(RingBuffer::new(0).capacity(), 1);
    }

    #[test]
    fn test_wraparound() {
        let ring = RingBuffer::new(8);

        assert_eq!(ring.write(&[1; 6]), 6);
        let mut output = [0i16; 4];
        assert_eq!(ring.read(&mut output), 4);

        assert_eq!(ring.write(&[2; 5]), 5);
        let mut rest = [0i16; 7];
        assert_eq!(ring.read(&mut rest), 7);
        assert_eq!(&rest[..2], &[1, 1]);
        assert_eq!(&rest[2..], &[2; 5]);
    }

    #[test]
    fn test_full_ring() {
        let ring = RingBuffer::new(4);
        assert_eq!(ring.write(&[1; 6]), 4);
        assert!(ring.is_full());
        assert_eq!(ring.write(&[2]), 0);

        let mut output = [0i16; 1];
        ring.read(&mut output);
        assert_eq!(ring.write(&[2]), 1);
    }

    #[test]
    fn test_clear() {
        let ring = RingBuffer::new(16);
        ring.write(&[7; 10]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 16);
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let ring = shared_ring_buffer(256);
        let producer = Arc::clone(&ring);

        let writer = thread::spawn(move || {
            let mut next = 0i16;
            while next < 10_000 {
                let batch: Vec<i16> = (next..next.saturating_add(64).min(10_000)).collect();
                let written = producer.write(&batch);
                next += written as i16;
                if written == 0 {
                    thread::yield_now();
                }
            }
        });

        let mut expected = 0i16;
        let mut output = [0i16; 50];
        while expected < 10_000 {
            let read = ring.read(&mut output);
            for &sample in &output[..read] {
                assert_eq!(sample, expected);
                expected += 1;
            }
            if read == 0 {
                thread::yield_now();
            }
        }

        writer.join().unwrap();
    }
}
