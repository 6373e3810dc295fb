//! An in-memory [`Connection`] that records every send for test assertions.
//!
//! The recorder half stays with the test while the connection half is moved into
//! a transport or flush thread.

use std::{io, sync::Arc, time::Duration};

use parking_lot::{Condvar, Mutex};

use crate::connection::Connection;

#[derive(Default)]
struct RecorderState {
    sent: Vec<Vec<u8>>,
    attempts: usize,
    opens: usize,
    failures_remaining: usize,
    panic_on_send: bool,
    stalled: bool,
}

/// Shared view onto a [`RecordingConnection`].
#[derive(Clone, Default)]
pub struct SendRecorder {
    state: Arc<Mutex<RecorderState>>,
    sent_cv: Arc<Condvar>,
    gate_cv: Arc<Condvar>,
}

impl SendRecorder {
    /// Create a recorder whose connection always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends.
    pub fn failing(self, count: usize) -> Self {
        self.state.lock().failures_remaining = count;
        self
    }

    /// Fail every send.
    pub fn always_failing(self) -> Self {
        self.failing(usize::MAX)
    }

    /// Panic inside `send`.
    pub fn panicking(self) -> Self {
        self.state.lock().panic_on_send = true;
        self
    }

    /// Hold every `send` until [`release`](Self::release) is called.
    pub fn stalling(self) -> Self {
        self.state.lock().stalled = true;
        self
    }

    /// Let stalled sends proceed.
    pub fn release(&self) {
        self.state.lock().stalled = false;
        self.gate_cv.notify_all();
    }

    /// Create the connection half. It starts closed.
    pub fn connection(&self) -> RecordingConnection {
        RecordingConnection {
            recorder: self.clone(),
            open: false,
        }
    }

    /// Payloads delivered so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Number of `open` calls, including reconnects.
    pub fn opens(&self) -> usize {
        self.state.lock().opens
    }

    /// Block until `count` payloads were delivered or `timeout` elapses.
    pub fn wait_for_sent(&self, count: usize, timeout: Duration) -> Vec<Vec<u8>> {
        let mut state = self.state.lock();
        let _ = self
            .sent_cv
            .wait_while_for(&mut state, |s| s.sent.len() < count, timeout);
        state.sent.clone()
    }

    /// Block until `count` sends were attempted or `timeout` elapses.
    pub fn wait_for_attempts(&self, count: usize, timeout: Duration) -> usize {
        let mut state = self.state.lock();
        let _ = self
            .sent_cv
            .wait_while_for(&mut state, |s| s.attempts < count, timeout);
        state.attempts
    }
}

/// Connection half recording payloads into its [`SendRecorder`].
pub struct RecordingConnection {
    recorder: SendRecorder,
    open: bool,
}

impl Connection for RecordingConnection {
    fn open(&mut self) {
        self.recorder.state.lock().opens += 1;
        self.open = true;
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        let mut state = self.recorder.state.lock();
        state.attempts += 1;
        self.recorder.sent_cv.notify_all();
        while state.stalled {
            self.recorder.gate_cv.wait(&mut state);
        }
        if state.panic_on_send {
            drop(state);
            panic!("recording connection asked to panic");
        }
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "injected failure"));
        }
        state.sent.push(payload.to_vec());
        drop(state);
        self.recorder.sent_cv.notify_all();
        Ok(payload.len())
    }
}
