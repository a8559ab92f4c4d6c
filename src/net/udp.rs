//! Lazily bound, non-blocking UDP listener.
//!
//! Each ingestion job owns one [`DatagramListener`] for the lifetime of the
//! process. The socket is bound on first use with `SO_REUSEADDR` and put in
//! non-blocking mode, so [`DatagramListener::drain`] reads everything that is
//! queued and returns as soon as the queue is empty.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

/// Largest datagram accepted; longer payloads are truncated by the kernel
/// and then fail to decode.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// One received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Packet source address.
    pub source: SocketAddr,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

/// UDP socket bound on first use and kept open until dropped.
///
/// A failed bind disables the listener for the rest of its lifetime. The
/// failure is reported once; later drains come back empty.
#[derive(Debug)]
pub struct DatagramListener {
    bind_addr: SocketAddr,
    socket: Option<UdpSocket>,
    disabled: bool,
}

impl DatagramListener {
    /// Creates a listener for `bind_addr` without binding yet.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            socket: None,
            disabled: false,
        }
    }

    /// Address this listener binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Whether an earlier bind failed.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Actual local address, once bound.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Binds the socket if it is not bound yet.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the socket cannot be created or bound, and
    /// an error of kind [`io::ErrorKind::NotConnected`] on every later call.
    pub fn ensure_bound(&mut self) -> io::Result<&UdpSocket> {
        if self.disabled {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("listener on {} disabled after bind failure", self.bind_addr),
            ));
        }
        if self.socket.is_none() {
            let socket = bind_reusable(self.bind_addr).inspect_err(|err| {
                tracing::error!(addr = %self.bind_addr, error = %err, "failed to set up udp socket");
                self.disabled = true;
            })?;
            tracing::info!(
                addr = %socket.local_addr().unwrap_or(self.bind_addr),
                "udp listener bound"
            );
            self.socket = Some(socket);
        }
        self.socket
            .as_ref()
            .ok_or_else(|| io::Error::other("socket missing after bind"))
    }

    /// Reads every queued datagram without blocking.
    ///
    /// An empty queue ends the drain. Interrupted reads are retried. A
    /// disabled listener yields an empty batch.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the first bind fails or a read fails for any
    /// reason other than an empty queue.
    pub fn drain(&mut self) -> io::Result<Vec<Datagram>> {
        if self.disabled {
            tracing::debug!(addr = %self.bind_addr, "listener disabled, nothing to drain");
            return Ok(Vec::new());
        }
        let socket = self.ensure_bound()?;
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let mut datagrams = Vec::new();
        loop {
            match socket.recv_from(&mut buf) {
                Ok((len, source)) => {
                    let payload = buf.get(..len).unwrap_or_default().to_vec();
                    datagrams.push(Datagram { source, payload });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(datagrams)
    }
}

/// Creates a non-blocking UDP socket with `SO_REUSEADDR` bound to `addr`.
fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
