//! Client-side publisher for spectatord-style metric lines.
//!
//! A [`Publisher`] forwards short text lines to a collector over a local
//! datagram socket or UDP. Delivery is best-effort and at-most-once: send
//! failures are retried with a reconnect between attempts, then logged and
//! dropped. With a non-zero flush threshold, `unix:` publishers coalesce
//! lines into batches written by a background flush thread.
//!
//! ```no_run
//! use spectator_publisher::Publisher;
//!
//! let publisher = Publisher::new("unix:/run/spectatord/spectatord.unix", 60_000)?;
//! publisher.publish("c:server.numRequests,id=failed:1");
//! publisher.shutdown();
//! # Ok::<(), spectator_publisher::PublisherError>(())
//! ```

mod buffer;
pub mod config;
pub mod connection;
pub mod endpoint;
mod error;
mod publisher;
mod transport;
mod worker;

#[cfg(test)]
mod test_utils;

pub use config::PublisherConfig;
pub use endpoint::Endpoint;
pub use error::PublisherError;
pub use publisher::Publisher;
pub use transport::TransportKind;
