//! Bounded FIFO of pending playback requests.
//!
//! A thin wrapper over a bounded crossbeam channel that maps [`Ticks`]
//! timeouts onto the channel's blocking calls.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::time::Duration;

use chirp_core::{Error, QueueEntry, Result, Ticks, Timeout};
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, TrySendError,
};
use tracing::trace;

/// Create a request queue holding at most `capacity` entries.
///
/// `tick_period` converts [`Ticks`] timeouts into wall-clock bounds.
pub fn request_queue(capacity: usize, tick_period: Duration) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = bounded(capacity);
    (
        QueueProducer {
            tx,
            capacity,
            tick_period,
        },
        QueueConsumer { rx, tick_period },
    )
}

/// Producer half, held by the engine on behalf of callers.
///
/// Dropping every producer closes the queue; the consumer drains what is left
/// and then reports no more entries.
#[derive(Clone)]
pub struct QueueProducer {
    tx: Sender<QueueEntry>,
    capacity: usize,
    tick_period: Duration,
}

impl QueueProducer {
    /// Insert `entry` at the tail, waiting up to `timeout` for space.
    ///
    /// On failure nothing is inserted and the entry is dropped.
    pub fn enqueue(&self, entry: QueueEntry, timeout: Ticks) -> Result<()> {
        let id = entry.id;
        match timeout.to_timeout(self.tick_period) {
            Timeout::Immediate => self.tx.try_send(entry).map_err(|e| match e {
                TrySendError::Full(_) => Error::QueueFull { timeout },
                TrySendError::Disconnected(_) => Error::QueueClosed,
            })?,
            Timeout::After(wait) => self.tx.send_timeout(entry, wait).map_err(|e| match e {
                SendTimeoutError::Timeout(_) => Error::QueueFull { timeout },
                SendTimeoutError::Disconnected(_) => Error::QueueClosed,
            })?,
            Timeout::Forever => self.tx.send(entry).map_err(|_| Error::QueueClosed)?,
        }
        trace!("Enqueued request {id} ({} pending)", self.tx.len());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Consumer half, held by the dispatcher.
pub struct QueueConsumer {
    rx: Receiver<QueueEntry>,
    tick_period: Duration,
}

impl QueueConsumer {
    /// Take the oldest entry, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout or once the queue is closed and drained. With
    /// [`Ticks::FOREVER`], `None` only ever means closed.
    pub fn dequeue(&self, timeout: Ticks) -> Option<QueueEntry> {
        match timeout.to_timeout(self.tick_period) {
            Timeout::Immediate => match self.rx.try_recv() {
                Ok(entry) => Some(entry),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
            },
            Timeout::After(wait) => match self.rx.recv_timeout(wait) {
                Ok(entry) => Some(entry),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
            },
            Timeout::Forever => self.rx.recv().ok(),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
