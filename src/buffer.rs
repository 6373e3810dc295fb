//! Double buffer shared by publishing threads and the flush thread.
//!
//! Producers append newline-terminated messages under a single lock. Two
//! condition variables coordinate the handoff: `can_produce` wakes producers
//! once the accumulator is back at or under the threshold, `should_flush`
//! wakes the flush thread once it has grown past it. Both are broadcast on
//! shutdown.

use std::{
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::{Condvar, Mutex};

use crate::config::BUFFER_SLACK;

/// Upper bound on the capacity reserved up front for a fresh accumulator.
const MAX_RESERVED_CAPACITY: usize = 1 << 20;

/// Monotonic false-to-true flag read by every thread without the buffer lock.
#[derive(Debug, Default)]
pub struct ShutdownFlag(AtomicBool);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` for the call that flipped it.
    pub fn request(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of offering a message to the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produced {
    /// Appended; the accumulator now holds `size` bytes.
    Buffered { size: usize },
    /// Shutdown was requested or no flush thread remains.
    Dropped,
}

struct BufferState {
    pending: String,
    flusher_alive: bool,
}

/// Accumulator plus the backpressure protocol guarding it.
pub struct SharedBuffer {
    state: Mutex<BufferState>,
    can_produce: Condvar,
    should_flush: Condvar,
    threshold: usize,
    shutdown: Arc<ShutdownFlag>,
}

impl SharedBuffer {
    pub fn new(threshold: usize, shutdown: Arc<ShutdownFlag>) -> Self {
        Self {
            state: Mutex::new(BufferState {
                pending: fresh_accumulator(threshold),
                flusher_alive: true,
            }),
            can_produce: Condvar::new(),
            should_flush: Condvar::new(),
            threshold,
            shutdown,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Append `message` and a newline, waiting while the accumulator is over
    /// the threshold.
    pub fn produce(&self, message: &str) -> Produced {
        let mut state = self.state.lock();
        self.can_produce.wait_while(&mut state, |s| {
            s.pending.len() > self.threshold && s.flusher_alive && !self.shutdown.is_requested()
        });
        if self.shutdown.is_requested() || !state.flusher_alive {
            return Produced::Dropped;
        }
        state.pending.push_str(message);
        state.pending.push('\n');
        let size = state.pending.len();
        drop(state);

        if size > self.threshold {
            self.should_flush.notify_one();
        } else {
            self.can_produce.notify_one();
        }
        Produced::Buffered { size }
    }

    /// Wait until the accumulator exceeds the threshold, then swap it for a
    /// fresh one and return the old content. Returns `None` on shutdown,
    /// discarding whatever was still pending.
    pub fn take_batch(&self) -> Option<String> {
        let mut state = self.state.lock();
        self.should_flush.wait_while(&mut state, |s| {
            s.pending.len() <= self.threshold && !self.shutdown.is_requested()
        });
        if self.shutdown.is_requested() {
            return None;
        }
        let batch = mem::replace(&mut state.pending, fresh_accumulator(self.threshold));
        drop(state);

        self.can_produce.notify_one();
        Some(batch)
    }

    /// Wake every waiter so it can observe the shutdown flag.
    pub fn wake_all(&self) {
        // Taking the lock orders the flag store before any waiter's re-check.
        drop(self.state.lock());
        self.can_produce.notify_all();
        self.should_flush.notify_all();
    }

    /// Record that the flush thread died; producers drop from now on.
    pub fn mark_flusher_dead(&self) {
        self.state.lock().flusher_alive = false;
        self.can_produce.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> String {
        self.state.lock().pending.clone()
    }
}

fn fresh_accumulator(threshold: usize) -> String {
    String::with_capacity(
        threshold
            .saturating_add(BUFFER_SLACK)
            .min(MAX_RESERVED_CAPACITY),
    )
}
