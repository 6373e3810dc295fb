//! Collector stand-ins for integration tests.
//!
//! Each collector binds a real socket and forwards every datagram it receives
//! to a channel so tests can assert on exact payloads.

#![allow(dead_code)]

use std::{
    net::{SocketAddr, UdpSocket},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, unbounded};
use rstest::fixture;

/// How long a test waits for a datagram that should arrive.
pub const DELIVERY: Duration = Duration::from_secs(2);
/// How long a test waits to conclude that nothing was sent.
pub const QUIET: Duration = Duration::from_millis(150);

fn pump<F>(mut recv: F) -> Receiver<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> std::io::Result<usize> + Send + 'static,
{
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let mut buf = vec![0u8; 65_536];
        while let Ok(len) = recv(&mut buf) {
            if tx.send(buf[..len].to_vec()).is_err() {
                break;
            }
        }
    });
    rx
}

/// UDP collector bound to an ephemeral loopback port.
pub struct UdpCollector {
    pub addr: SocketAddr,
    pub datagrams: Receiver<Vec<u8>>,
}

#[fixture]
pub fn udp_collector() -> UdpCollector {
    let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("bind udp collector");
    let addr = socket.local_addr().expect("collector address");
    let datagrams = pump(move |buf| socket.recv(buf));
    UdpCollector { addr, datagrams }
}

#[cfg(unix)]
pub mod unix {
    use std::{os::unix::net::UnixDatagram, path::PathBuf};

    use crossbeam_channel::Receiver;
    use rstest::fixture;
    use tempfile::TempDir;

    /// Local datagram collector inside a temporary directory.
    pub struct UnixCollector {
        pub path: PathBuf,
        pub datagrams: Receiver<Vec<u8>>,
        _dir: TempDir,
    }

    impl UnixCollector {
        pub fn endpoint(&self) -> String {
            format!("unix:{}", self.path.display())
        }
    }

    #[fixture]
    pub fn unix_collector() -> UnixCollector {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("spectatord.unix");
        let socket = UnixDatagram::bind(&path).expect("bind unix collector");
        let datagrams = super::pump(move |buf| socket.recv(buf));
        UnixCollector {
            path,
            datagrams,
            _dir: dir,
        }
    }
}
