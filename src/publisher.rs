//! Public publisher type exported by the crate.

use std::{fmt, sync::Arc};

use crate::{
    buffer::ShutdownFlag,
    config::PublisherConfig,
    endpoint::Endpoint,
    error::PublisherError,
    transport::{Transport, TransportKind},
};

/// Forwards metric lines to a collector, best-effort.
///
/// `publish` never fails and only blocks when a buffered publisher is over
/// its flush threshold. A `Publisher` is `Send + Sync`; share it behind an
/// `Arc` to publish from many threads.
pub struct Publisher {
    endpoint: Endpoint,
    transport: Transport,
    shutdown: Arc<ShutdownFlag>,
}

impl Publisher {
    /// Construct a publisher for `endpoint` with default socket settings.
    ///
    /// # Errors
    ///
    /// Fails when a `udp:` endpoint cannot be parsed or resolved, or the
    /// flush thread cannot be started.
    pub fn new(endpoint: &str, flush_threshold: usize) -> Result<Self, PublisherError> {
        Self::with_config(PublisherConfig::new(endpoint).with_flush_threshold(flush_threshold))
    }

    /// Construct the publisher from a configuration object.
    ///
    /// # Errors
    ///
    /// As [`Publisher::new`], plus [`PublisherError::InvalidConfig`] for
    /// rejected configuration values.
    pub fn with_config(config: PublisherConfig) -> Result<Self, PublisherError> {
        config.validate()?;
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let shutdown = Arc::new(ShutdownFlag::new());
        let transport = Transport::from_endpoint(&endpoint, &config, Arc::clone(&shutdown))?;
        Ok(Self {
            endpoint,
            transport,
            shutdown,
        })
    }

    /// Publish one metric line. Failures are logged and the line is dropped.
    pub fn publish(&self, message: &str) {
        self.transport.send(message);
    }

    /// Stop publishing and wait for the flush thread, if any, to exit.
    ///
    /// Messages still buffered are discarded. Calling this more than once is
    /// harmless, and it runs automatically on drop.
    pub fn shutdown(&self) {
        self.shutdown.request();
        self.transport.stop();
    }

    /// Whether [`shutdown`](Publisher::shutdown) has been requested.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Classification of the configured endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Strategy selected for the endpoint and threshold.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        endpoint: Endpoint,
        transport: Transport,
        shutdown: Arc<ShutdownFlag>,
    ) -> Self {
        Self {
            endpoint,
            transport,
            shutdown,
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("endpoint", &self.endpoint)
            .field("transport", &self.transport)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
