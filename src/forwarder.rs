//! Fire-and-forget UDP forwarding of accepted sentences
//!
//! One datagram per sentence, delimiter excluded. Send failures are
//! logged and dropped: the aggregation feed tolerates gaps, and blocking
//! the upstream read loop on downstream trouble would lose more data
//! than it saves.

use crate::error::{Error, Result};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Stateless sender over a connectionless channel to a fixed destination
pub struct UdpForwarder {
    socket: UdpSocket,
    dest: SocketAddr,
}

impl UdpForwarder {
    /// Create the outbound socket and resolve the destination.
    ///
    /// Both failures are fatal at startup: forwarding has no meaning
    /// without a working datagram channel.
    pub fn open(host: &str, port: u16) -> Result<Self> {
        let dest = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::Resolve(format!("{}:{}", host, port)))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        log::info!(
            "UDP forwarder ready: {} -> {}",
            socket.local_addr()?,
            dest
        );
        Ok(Self { socket, dest })
    }

    /// Destination this forwarder sends to
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Send one sentence as a single datagram, best-effort.
    pub fn send(&self, sentence: &[u8]) {
        // UDP send errors are not fatal - just log and continue
        if let Err(e) = self.socket.send_to(sentence, self.dest) {
            log::warn!("UDP send to {} failed: {}", self.dest, e);
        }
    }
}
