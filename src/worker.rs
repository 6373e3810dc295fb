//! Flush thread draining the shared buffer into a connection.

use std::{
    any::Any,
    io,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::error;

use crate::{
    buffer::SharedBuffer,
    connection::SharedConnection,
};

/// Name given to the flush thread.
pub const FLUSHER_THREAD_NAME: &str = "spectator-flusher";

/// Start the flush thread. It owns `connection` until it exits.
pub(crate) fn spawn_flusher(
    buffer: Arc<SharedBuffer>,
    connection: SharedConnection,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(FLUSHER_THREAD_NAME.into())
        .spawn(move || flush_loop(&buffer, connection))
}

fn flush_loop(buffer: &SharedBuffer, connection: SharedConnection) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        while let Some(batch) = buffer.take_batch() {
            connection.send_with_retry(batch.as_bytes());
        }
    }));
    if let Err(payload) = outcome {
        error!("Fatal error in flush thread: {}", panic_message(payload.as_ref()));
        buffer.mark_flusher_dead();
    }
    connection.close();
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
