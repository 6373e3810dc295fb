//! Errors surfaced while constructing a [`Publisher`](crate::Publisher).
//!
//! Once a publisher exists nothing reaches the caller: send and connect
//! failures are logged and retried or dropped inside the transport.

use std::io;

use thiserror::Error;

/// Errors that may occur while building a publisher.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The `udp:` descriptor lacks the `host:port` separator.
    #[error("Unable to parse udp endpoint: '{host_port}'. Expecting hostname:port")]
    InvalidUdpEndpoint { host_port: String },
    /// The host or port could not be resolved.
    #[error("Unable to resolve udp endpoint '{host_port}': {source}")]
    Resolve {
        host_port: String,
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but produced no usable address.
    #[error("Udp endpoint '{host_port}' resolved to no addresses")]
    NoAddress { host_port: String },
    /// Invalid user supplied configuration.
    #[error("invalid publisher configuration: {0}")]
    InvalidConfig(String),
    /// The flush thread could not be started.
    #[error("unable to start flush thread: {0}")]
    SpawnFlusher(#[source] io::Error),
}
