//! Connection handles owning a single outbound socket.
//!
//! A handle opens lazily and never raises past its own boundary: connect
//! failures are logged and leave the handle closed. [`SharedConnection`]
//! holds the retry policy shared by every transport.

use std::{
    fmt, io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

use log::{trace, warn};
use parking_lot::RwLock;

use crate::{buffer::ShutdownFlag, config::SEND_ATTEMPTS};

/// Outbound socket lifecycle used by the transports.
///
/// `send` takes `&self` so several threads can write through one handle.
/// Opening and closing need `&mut self`.
pub trait Connection: Send + Sync {
    /// Create and connect the socket. Failures are logged, not returned.
    fn open(&mut self);

    /// Release the socket if open. Idempotent.
    fn close(&mut self);

    /// Whether the last [`open`](Connection::open) succeeded.
    fn is_open(&self) -> bool;

    /// Write `payload` once. Fails with [`io::ErrorKind::NotConnected`]
    /// while the handle is closed.
    fn send(&self, payload: &[u8]) -> io::Result<usize>;

    /// Close then reopen the socket.
    fn reconnect(&mut self) {
        self.close();
        self.open();
    }
}

/// Destination a [`SocketConnection`] connects to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    /// Local-domain datagram socket path.
    Unix(PathBuf),
    /// Resolved UDP collector address.
    Udp(SocketAddr),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "{}", path.display()),
            Self::Udp(addr) => write!(f, "{addr}"),
        }
    }
}

enum ActiveSocket {
    Udp(UdpSocket),
    #[cfg(unix)]
    Unix(UnixDatagram),
}

impl ActiveSocket {
    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        match self {
            ActiveSocket::Udp(socket) => socket.send(payload),
            #[cfg(unix)]
            ActiveSocket::Unix(socket) => socket.send(payload),
        }
    }
}

fn connect_udp(addr: SocketAddr, write_timeout: Option<Duration>) -> io::Result<UdpSocket> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(addr)?;
    socket.set_write_timeout(write_timeout)?;
    Ok(socket)
}

fn connect_destination(
    destination: &Destination,
    write_timeout: Option<Duration>,
) -> io::Result<ActiveSocket> {
    match destination {
        Destination::Udp(addr) => connect_udp(*addr, write_timeout).map(ActiveSocket::Udp),
        Destination::Unix(path) => {
            #[cfg(unix)]
            {
                let socket = UnixDatagram::unbound()?;
                socket.connect(path)?;
                socket.set_write_timeout(write_timeout)?;
                Ok(ActiveSocket::Unix(socket))
            }
            #[cfg(not(unix))]
            {
                let _ = (path, write_timeout);
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix domain sockets are not supported on this platform",
                ))
            }
        }
    }
}

/// Connection handle backed by a real datagram socket.
pub struct SocketConnection {
    destination: Destination,
    write_timeout: Option<Duration>,
    socket: Option<ActiveSocket>,
}

impl SocketConnection {
    /// Create a closed handle bound to `destination`.
    pub fn new(destination: Destination, write_timeout: Option<Duration>) -> Self {
        Self {
            destination,
            write_timeout,
            socket: None,
        }
    }
}

impl Connection for SocketConnection {
    fn open(&mut self) {
        match connect_destination(&self.destination, self.write_timeout) {
            Ok(socket) => self.socket = Some(socket),
            Err(err) => {
                self.socket = None;
                warn!("Unable to connect to {}: {err}", self.destination);
            }
        }
    }

    fn close(&mut self) {
        self.socket = None;
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&self, payload: &[u8]) -> io::Result<usize> {
        match &self.socket {
            Some(socket) => socket.send(payload),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("no open socket for {}", self.destination),
            )),
        }
    }
}

impl fmt::Debug for SocketConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketConnection")
            .field("destination", &self.destination)
            .field("open", &self.is_open())
            .finish()
    }
}

/// A connection shared between writers, silenced once shutdown is requested.
///
/// Sends run concurrently under the read lock. Reconnecting and closing take
/// the write lock, so a caller waits for in-flight sends rather than for
/// another caller's whole retry sequence.
pub(crate) struct SharedConnection {
    connection: RwLock<Box<dyn Connection>>,
    shutdown: Arc<ShutdownFlag>,
}

impl SharedConnection {
    /// Open `connection` and share it.
    pub(crate) fn open(mut connection: Box<dyn Connection>, shutdown: Arc<ShutdownFlag>) -> Self {
        connection.open();
        Self {
            connection: RwLock::new(connection),
            shutdown,
        }
    }

    /// Send `payload`, reconnecting after each failure, for up to
    /// [`SEND_ATTEMPTS`] attempts. Returns `false` once the payload is dropped.
    pub(crate) fn send_with_retry(&self, payload: &[u8]) -> bool {
        for attempt in 1..=SEND_ATTEMPTS {
            let result = {
                let connection = self.connection.read();
                // Checked under the lock so nothing is written once `close` ran.
                if self.shutdown.is_requested() {
                    trace!("Publisher shut down; dropping {} bytes", payload.len());
                    return false;
                }
                connection.send(payload)
            };
            match result {
                Ok(sent) => {
                    trace!("Sent {sent} bytes, in total had {}", payload.len());
                    return true;
                }
                Err(err) => {
                    warn!(
                        "Unable to send {} - attempt {attempt}/{SEND_ATTEMPTS} ({err})",
                        String::from_utf8_lossy(payload)
                    );
                    self.reconnect();
                }
            }
        }
        warn!(
            "Dropped {} bytes after {SEND_ATTEMPTS} failed send attempts",
            payload.len()
        );
        false
    }

    fn reconnect(&self) {
        let mut connection = self.connection.write();
        if !self.shutdown.is_requested() {
            connection.reconnect();
        }
    }

    /// Close the socket. Sends issued afterwards see the shutdown flag and
    /// never reach it.
    pub(crate) fn close(&self) {
        self.connection.write().close();
    }
}
