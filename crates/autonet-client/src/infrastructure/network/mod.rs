//! Network infrastructure for the broadcaster.
//!
//! [`UdpBroadcastTransport`] owns a broadcast-enabled UDP socket bound to an
//! ephemeral port.  Announcements go to the configured broadcast address and
//! discovery port; replies come back to the ephemeral port as unicast from
//! the coordinator.
//!
//! Socket setup errors are returned as [`TransportError`] and are not
//! retried.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::application::discovery::DiscoveryTransport;

/// Largest reply the transport accepts.
const RECV_BUFFER_SIZE: usize = 4096;

/// Errors that can occur while setting up the broadcast socket.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket could not be bound.
    #[error("failed to bind broadcast socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// `SO_BROADCAST` could not be enabled.
    #[error("set socket broadcast failed: {0}")]
    Broadcast(#[source] std::io::Error),
}

/// UDP transport for one discovery run.
#[derive(Debug)]
pub struct UdpBroadcastTransport {
    socket: UdpSocket,
    target: SocketAddr,
    buf: Vec<u8>,
}

impl UdpBroadcastTransport {
    /// Binds an ephemeral port on all interfaces and enables broadcast.
    ///
    /// # Errors
    ///
    /// See [`TransportError`].
    pub async fn bind(target: SocketAddr) -> Result<Self, TransportError> {
        Self::bind_on(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0), target).await
    }

    /// Binds `local` instead of the wildcard address.  Used with loopback
    /// targets.
    ///
    /// # Errors
    ///
    /// See [`TransportError`].
    pub async fn bind_on(local: SocketAddr, target: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| TransportError::Bind { addr: local, source })?;
        socket.set_broadcast(true).map_err(TransportError::Broadcast)?;
        debug!(
            "broadcast socket bound on {:?}, target {target}",
            socket.local_addr().ok()
        );
        Ok(Self {
            socket,
            target,
            buf: vec![0u8; RECV_BUFFER_SIZE],
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl DiscoveryTransport for UdpBroadcastTransport {
    async fn send_announcement(&mut self, payload: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(payload, self.target).await.map(|_| ())
    }

    async fn recv_reply(
        &mut self,
        wait: Duration,
    ) -> std::io::Result<Option<(Vec<u8>, SocketAddr)>> {
        match tokio::time::timeout(wait, self.socket.recv_from(&mut self.buf)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok((len, from))) => Ok(Some((self.buf[..len].to_vec(), from))),
            Ok(Err(e)) => Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
