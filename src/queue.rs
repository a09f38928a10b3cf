//! Unbounded FIFO hand-off between request threads and the persistence
//! worker.
//!
//! The item sequence and the wake/wait signal sit behind independent locks:
//! signaling a consumer never blocks on queue mutation, and queue mutation
//! never blocks on a sleeping consumer. Depth is unbounded: a persistently
//! slow consumer grows memory without limit, an accepted trade-off of this
//! back-pressure-free design.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// What woke a blocking [`TransferQueue::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The queue was observably non-empty at least once. A following `pop`
    /// may still come back empty if a racing consumer drained it.
    Ready,
    /// The queue was closed; no further wake-ups will arrive.
    Closed,
}

struct Signal {
    closed: Mutex<bool>,
    nonempty: Condvar,
}

/// Unbounded multi-producer FIFO with one blocking consumer.
pub struct TransferQueue<T> {
    items: Mutex<VecDeque<T>>,
    signal: Signal,
}

impl<T> TransferQueue<T> {
    /// Creates an empty, open queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            signal: Signal {
                closed: Mutex::new(false),
                nonempty: Condvar::new(),
            },
        }
    }

    /// Appends `item` to the tail and wakes one waiting consumer.
    pub fn push(&self, item: T) {
        self.items.lock().push_back(item);

        let _closed = self.signal.closed.lock();
        self.signal.nonempty.notify_one();
    }

    /// Pops the head if present. Never blocks.
    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Blocks until the queue is observably non-empty or closed.
    ///
    /// Spurious condition-variable wake-ups re-check and go back to sleep;
    /// `Closed` wins over pending items so shutdown is prompt.
    pub fn wait(&self) -> WaitOutcome {
        let mut closed = self.signal.closed.lock();
        loop {
            if *closed {
                return WaitOutcome::Closed;
            }
            if !self.items.lock().is_empty() {
                return WaitOutcome::Ready;
            }
            self.signal.nonempty.wait(&mut closed);
        }
    }

    /// Marks the queue closed and wakes every waiter. Items already queued
    /// stay poppable; further pushes are not prevented but will never wake
    /// anyone again.
    pub fn close(&self) {
        *self.signal.closed.lock() = true;
        self.signal.nonempty.notify_all();
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T> Default for TransferQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
