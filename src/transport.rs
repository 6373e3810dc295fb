//! Transport strategies selected once per publisher.
//!
//! Unbuffered and UDP transports send on the caller's thread. The buffered
//! transport appends to a [`SharedBuffer`] and leaves the socket to its flush
//! thread.

use std::{fmt, sync::Arc, thread::JoinHandle};

use log::{trace, warn};
use parking_lot::Mutex;

use crate::{
    buffer::{Produced, SharedBuffer, ShutdownFlag},
    config::PublisherConfig,
    connection::{Connection, Destination, SharedConnection, SocketConnection},
    endpoint::Endpoint,
    error::PublisherError,
    worker::spawn_flusher,
};

/// Which transport strategy a publisher selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Messages are only traced.
    Disabled,
    /// Each message is written to the local socket immediately.
    Unbuffered,
    /// Messages are batched and written by the flush thread.
    Buffered,
    /// Each message is sent as one UDP datagram immediately.
    Udp,
}

/// Appends to the shared buffer; a dedicated thread does the writing.
pub(crate) struct BufferedSender {
    buffer: Arc<SharedBuffer>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSender {
    fn start(
        connection: Box<dyn Connection>,
        threshold: usize,
        shutdown: Arc<ShutdownFlag>,
    ) -> Result<Self, PublisherError> {
        let connection = SharedConnection::open(connection, Arc::clone(&shutdown));
        let buffer = Arc::new(SharedBuffer::new(threshold, shutdown));
        let handle =
            spawn_flusher(Arc::clone(&buffer), connection).map_err(PublisherError::SpawnFlusher)?;
        Ok(Self {
            buffer,
            flusher: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, message: &str) {
        match self.buffer.produce(message) {
            Produced::Buffered { size } => trace!("Buffered {size} bytes"),
            Produced::Dropped => trace!("Buffer closed; dropping {message}"),
        }
    }

    fn stop(&self) {
        self.buffer.wake_all();
        let Some(handle) = self.flusher.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("Publisher flush thread panicked");
        }
    }
}

/// The strategy behind a [`Publisher`](crate::Publisher).
pub(crate) enum Transport {
    Disabled,
    Unbuffered(SharedConnection),
    Buffered(BufferedSender),
    Udp(SharedConnection),
}

impl Transport {
    /// Select and start the strategy for `endpoint`.
    pub(crate) fn from_endpoint(
        endpoint: &Endpoint,
        config: &PublisherConfig,
        shutdown: Arc<ShutdownFlag>,
    ) -> Result<Self, PublisherError> {
        let write_timeout = config.write_timeout();
        match endpoint {
            Endpoint::Disabled => Ok(Self::Disabled),
            Endpoint::Unknown(raw) => {
                warn!(
                    "Unknown endpoint: '{raw}'. Expecting: 'unix:/path/to/socket' \
                     or 'udp:hostname:port' - Will not send metrics"
                );
                Ok(Self::Disabled)
            }
            Endpoint::Unix(path) => {
                let connection =
                    SocketConnection::new(Destination::Unix(path.clone()), write_timeout);
                Self::local(Box::new(connection), config.flush_threshold, shutdown)
            }
            Endpoint::Udp(addr) => {
                let connection = SocketConnection::new(Destination::Udp(*addr), write_timeout);
                Ok(Self::udp(Box::new(connection), shutdown))
            }
        }
    }

    /// Local-socket strategy: buffered when `threshold` is non-zero.
    pub(crate) fn local(
        connection: Box<dyn Connection>,
        threshold: usize,
        shutdown: Arc<ShutdownFlag>,
    ) -> Result<Self, PublisherError> {
        if threshold == 0 {
            return Ok(Self::Unbuffered(SharedConnection::open(connection, shutdown)));
        }
        BufferedSender::start(connection, threshold, shutdown).map(Self::Buffered)
    }

    pub(crate) fn udp(connection: Box<dyn Connection>, shutdown: Arc<ShutdownFlag>) -> Self {
        Self::Udp(SharedConnection::open(connection, shutdown))
    }

    pub(crate) fn kind(&self) -> TransportKind {
        match self {
            Self::Disabled => TransportKind::Disabled,
            Self::Unbuffered(_) => TransportKind::Unbuffered,
            Self::Buffered(_) => TransportKind::Buffered,
            Self::Udp(_) => TransportKind::Udp,
        }
    }

    pub(crate) fn send(&self, message: &str) {
        match self {
            Self::Disabled => trace!("{message}"),
            Self::Unbuffered(connection) | Self::Udp(connection) => {
                connection.send_with_retry(message.as_bytes());
            }
            Self::Buffered(sender) => sender.send(message),
        }
    }

    /// Release waiters, join the flush thread and close the connection.
    /// Callers set the shutdown flag first.
    pub(crate) fn stop(&self) {
        match self {
            Self::Disabled => {}
            Self::Unbuffered(connection) | Self::Udp(connection) => connection.close(),
            Self::Buffered(sender) => sender.stop(),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Transport");
        debug.field("kind", &self.kind());
        if let Self::Buffered(sender) = self {
            debug.field("flush_threshold", &sender.buffer.threshold());
        }
        debug.finish()
    }
}
