//! Configuration structures consumed by the publisher lifecycle.
//!
//! `PublisherConfig` derives `Deserialize` so host applications can embed it
//! in their own configuration files; loading those files is left to them.

use std::time::Duration;

use serde::Deserialize;

use crate::error::PublisherError;

/// Default endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "udp:127.0.0.1:1234";
/// Default buffering threshold in bytes. Zero disables buffering.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 0;
/// Default write timeout applied to socket writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Number of send attempts made before a message or batch is dropped.
pub const SEND_ATTEMPTS: u32 = 3;
/// Extra capacity reserved in each fresh accumulator beyond the threshold.
pub const BUFFER_SLACK: usize = 1024;

/// Configuration object describing how to construct a [`Publisher`](crate::Publisher).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublisherConfig {
    /// Endpoint descriptor, e.g. `unix:/run/spectatord/spectatord.unix`.
    pub endpoint: String,
    /// Bytes to accumulate before flushing. Only honoured for `unix:` endpoints.
    pub flush_threshold: usize,
    /// Socket write timeout in milliseconds; `None` blocks without limit.
    pub write_timeout_ms: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            write_timeout_ms: Some(whole_millis(DEFAULT_WRITE_TIMEOUT)),
        }
    }
}

impl PublisherConfig {
    /// Create a configuration for `endpoint` with all other values defaulted.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Override the buffering threshold.
    pub fn with_flush_threshold(mut self, flush_threshold: usize) -> Self {
        self.flush_threshold = flush_threshold;
        self
    }

    /// Override the socket write timeout. Sub-millisecond remainders round
    /// up, so any non-zero timeout stays non-zero.
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout_ms = timeout.map(whole_millis);
        self
    }

    /// Socket write timeout as a [`Duration`].
    pub fn write_timeout(&self) -> Option<Duration> {
        self.write_timeout_ms.map(Duration::from_millis)
    }

    /// Reject values the socket layer cannot honour.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] when the write timeout is
    /// zero.
    pub fn validate(&self) -> Result<(), PublisherError> {
        if self.write_timeout_ms == Some(0) {
            return Err(PublisherError::InvalidConfig(
                "write_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn whole_millis(timeout: Duration) -> u64 {
    let partial = u128::from(timeout.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(timeout.as_millis() + partial).unwrap_or(u64::MAX)
}
