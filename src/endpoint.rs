//! Endpoint descriptor classification.
//!
//! Accepted forms are `disabled`, `unix:<path>`, `udp:<host>:<port>` and
//! `udp://<host>:<port>`. Scheme prefixes are case-sensitive. Anything else is
//! classified as [`Endpoint::Unknown`] and later treated as disabled.

use std::{
    fmt, io,
    net::{SocketAddr, ToSocketAddrs},
    path::PathBuf,
};

use crate::error::PublisherError;

const DISABLED: &str = "disabled";
const UNIX_SCHEME: &str = "unix:";
const UDP_SCHEME: &str = "udp:";

/// Parsed form of an endpoint descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Metrics are only traced, never sent.
    Disabled,
    /// Local-domain datagram socket at the given path.
    Unix(PathBuf),
    /// UDP collector at a resolved address.
    Udp(SocketAddr),
    /// Unrecognised descriptor, kept verbatim for diagnostics.
    Unknown(String),
}

impl Endpoint {
    /// Classify `descriptor`, resolving `udp:` addresses immediately.
    ///
    /// # Errors
    ///
    /// Returns an error when a `udp:` descriptor cannot be split into
    /// `host:port` or the host cannot be resolved.
    pub fn parse(descriptor: &str) -> Result<Self, PublisherError> {
        if descriptor == DISABLED {
            return Ok(Self::Disabled);
        }
        if let Some(path) = descriptor.strip_prefix(UNIX_SCHEME) {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if let Some(rest) = descriptor.strip_prefix(UDP_SCHEME) {
            let host_port = rest.strip_prefix("//").unwrap_or(rest);
            return resolve_host_port(host_port).map(Self::Udp);
        }
        Ok(Self::Unknown(descriptor.to_owned()))
    }

    /// Return `true` when no socket will ever be opened for this endpoint.
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled | Self::Unknown(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str(DISABLED),
            Self::Unix(path) => write!(f, "{UNIX_SCHEME}{}", path.display()),
            Self::Udp(addr) => write!(f, "{UDP_SCHEME}{addr}"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Resolve `host:port` to the first address reported by the system resolver.
///
/// The split happens on the last `:` so bracketed IPv6 literals such as
/// `[::1]:1234` are accepted.
///
/// # Errors
///
/// Returns [`PublisherError::InvalidUdpEndpoint`] when there is no `:`,
/// [`PublisherError::Resolve`] when the port is not numeric or the lookup
/// fails, and [`PublisherError::NoAddress`] when the lookup is empty.
pub fn resolve_host_port(host_port: &str) -> Result<SocketAddr, PublisherError> {
    let Some((host, port)) = host_port.rsplit_once(':') else {
        return Err(PublisherError::InvalidUdpEndpoint {
            host_port: host_port.to_owned(),
        });
    };
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    let port: u16 = port.parse().map_err(|err| PublisherError::Resolve {
        host_port: host_port.to_owned(),
        source: io::Error::new(io::ErrorKind::InvalidInput, format!("invalid port: {err}")),
    })?;
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| PublisherError::Resolve {
            host_port: host_port.to_owned(),
            source,
        })?;
    addrs.next().ok_or_else(|| PublisherError::NoAddress {
        host_port: host_port.to_owned(),
    })
}
