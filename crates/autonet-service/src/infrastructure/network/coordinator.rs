//! UDP coordinator: receives announcements and dispatches handshake sessions.
//!
//! The coordinator binds a UDP socket on the discovery port (default 37800)
//! across all local interfaces.  For every datagram it:
//!
//! 1. Parses an [`Announcement`] from the payload; anything else is logged
//!    and dropped.
//! 2. Asks the [`DeviceRegistry`] to admit the device.  Duplicate
//!    announcements (device already connecting or connected) stop here.
//! 3. Submits a [`HandshakeSession`] for the new device to the
//!    [`SessionPool`].  The session sends the rendezvous offer from this same
//!    socket, so replies come from the well-known port.
//!
//! # Startup and teardown
//!
//! [`Coordinator::new`] validates the configuration and encodes the offer
//! payload once; every session shares that buffer read-only.
//! [`Coordinator::start`] binds the socket (a bind failure is returned to the
//! caller, never retried) and runs the receive loop either inline
//! (`blocking = true`) or as a spawned task.
//!
//! The loop ends on [`Coordinator::shutdown`] or on the first receive error
//! that is not a timeout.  Either way the pool is shut down, devices still
//! connecting are evicted, and the socket is dropped.  Restarting is left to
//! the caller.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use autonet_core::{Announcement, DeviceId, DeviceInfo, ProtocolError, RendezvousOffer};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::handshake::{HandshakePolicy, HandshakeSession, OfferSender};
use crate::application::registry::{Admission, DeviceRegistry};
use crate::domain::{ConfigError, CoordinatorConfig};
use crate::infrastructure::network::pool::SessionPool;

/// Largest datagram the receive loop accepts; longer ones are truncated and
/// then fail to parse.
const RECV_BUFFER_SIZE: usize = 4096;

/// Error type for coordinator operations.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The configuration failed validation.
    #[error("invalid coordinator configuration: {0}")]
    Config(#[from] ConfigError),
    /// The rendezvous offer could not be encoded.
    #[error("failed to build rendezvous offer: {0}")]
    Offer(#[from] ProtocolError),
    /// The UDP socket could not be bound.
    #[error("failed to bind coordinator socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// `start` was called on a coordinator that is already running.
    #[error("coordinator already started")]
    AlreadyStarted,
    /// A non-timeout receive error ended the loop.
    #[error("recv error: {0}")]
    Recv(#[source] std::io::Error),
}

/// Result type carried by a detached receive loop.
pub type LoopHandle = JoinHandle<Result<(), CoordinatorError>>;

#[async_trait]
impl OfferSender for UdpSocket {
    async fn send_offer(&self, payload: &[u8], peer: SocketAddr) -> std::io::Result<()> {
        self.send_to(payload, peer).await.map(|_| ())
    }
}

/// The coordinator role: socket loop plus registry operations.
pub struct Coordinator {
    config: Arc<CoordinatorConfig>,
    registry: Arc<DeviceRegistry>,
    pool: SessionPool,
    offer: Arc<[u8]>,
    started: AtomicBool,
    local_addr: OnceLock<SocketAddr>,
    shutdown_tx: watch::Sender<bool>,
}

impl Coordinator {
    /// Validates `config`, pre-encodes the rendezvous offer, and takes
    /// ownership of the session pool.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::Config`] for an invalid configuration,
    /// [`CoordinatorError::Offer`] if the URI cannot be encoded.
    pub fn new(config: CoordinatorConfig, pool: SessionPool) -> Result<Self, CoordinatorError> {
        config.validate()?;
        let offer: Arc<[u8]> = RendezvousOffer::new(config.rendezvous_uri.as_str())
            .encode()?
            .into();
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(DeviceRegistry::new()),
            pool,
            offer,
            started: AtomicBool::new(false),
            local_addr: OnceLock::new(),
            shutdown_tx,
        })
    }

    /// Binds the socket and runs the receive loop.
    ///
    /// With `blocking = true` the loop runs on the calling task and this
    /// returns `Ok(None)` after [`shutdown`](Self::shutdown), or the receive
    /// error that ended it.  With `blocking = false` the loop is spawned and
    /// its handle returned.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::BindFailed`] if the socket cannot be bound,
    /// [`CoordinatorError::AlreadyStarted`] on a second call.
    pub async fn start(&self, blocking: bool) -> Result<Option<LoopHandle>, CoordinatorError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CoordinatorError::AlreadyStarted);
        }

        let addr = self.config.listen_addr();
        let socket = match UdpSocket::bind(addr).await {
            Ok(socket) => socket,
            Err(source) => {
                self.started.store(false, Ordering::SeqCst);
                error!("auto-networking service bind failed on {addr}: {source}");
                return Err(CoordinatorError::BindFailed { addr, source });
            }
        };
        let local = socket.local_addr().unwrap_or(addr);
        // `started` guarantees this is the first and only bind.
        let _ = self.local_addr.set(local);
        info!("auto-networking service listening on UDP {local}");

        let receiver = ReceiveLoop {
            socket: Arc::new(socket),
            registry: Arc::clone(&self.registry),
            pool: self.pool.clone(),
            offer: Arc::clone(&self.offer),
            policy: HandshakePolicy::from(self.config.as_ref()),
            shutdown: self.shutdown_tx.subscribe(),
        };

        if blocking {
            receiver.run().await.map(|()| None)
        } else {
            Ok(Some(tokio::spawn(receiver.run())))
        }
    }

    /// Asks the receive loop to stop.  Safe to call before `start` or twice.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Reports that `device_id` joined the messaging channel.
    pub fn networking_complete(&self, device_id: &str) -> bool {
        self.registry.networking_complete(device_id)
    }

    /// Forgets a connected device.
    pub fn disconnect(&self, device_id: &str) -> bool {
        self.registry.disconnect(device_id)
    }

    /// Abandons the handshake of a connecting device; its session stops at
    /// the next tick.
    pub fn cancel_handshake(&self, device_id: &str) -> bool {
        self.registry.evict(device_id)
    }

    pub fn get_devices(&self) -> Vec<(DeviceId, DeviceInfo)> {
        self.registry.get_devices()
    }

    pub fn is_device_connecting(&self, device_id: &str) -> bool {
        self.registry.is_device_connecting(device_id)
    }

    pub fn is_device_connected(&self, device_id: &str) -> bool {
        self.registry.is_device_connected(device_id)
    }

    /// Number of handshakes in flight.
    pub fn connecting_count(&self) -> usize {
        self.registry.connecting_count()
    }

    /// Shared registry, for collaborators that report completion directly.
    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    /// The bound socket address, once `start` succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }
}

/// State moved into the receive task.
struct ReceiveLoop {
    socket: Arc<UdpSocket>,
    registry: Arc<DeviceRegistry>,
    pool: SessionPool,
    offer: Arc<[u8]>,
    policy: HandshakePolicy,
    shutdown: watch::Receiver<bool>,
}

impl ReceiveLoop {
    async fn run(mut self) -> Result<(), CoordinatorError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        let result = loop {
            let received = tokio::select! {
                // A dropped sender also ends the loop: nobody can stop it otherwise.
                _ = self.shutdown.wait_for(|stop| *stop) => None,
                r = self.socket.recv_from(&mut buf) => Some(r),
            };

            match received {
                None => {
                    info!("auto-networking service shutting down");
                    break Ok(());
                }
                Some(Ok((len, src))) => {
                    debug!("recv msg {len} bytes, from {src}");
                    self.handle_datagram(&buf[..len], src);
                }
                Some(Err(e)) if is_timeout_error(&e) => continue,
                Some(Err(e)) => {
                    error!("auto-networking service recvfrom failed: {e}");
                    break Err(CoordinatorError::Recv(e));
                }
            }
        };

        self.teardown();
        result
    }

    fn handle_datagram(&self, data: &[u8], src: SocketAddr) {
        let announcement = match Announcement::decode(data) {
            Ok(a) => a,
            Err(e) => {
                warn!("datagram from {src} dropped: {e}");
                return;
            }
        };
        let Announcement { device_id, info } = announcement;
        debug!(
            "device id {device_id}, type {}, name {}",
            info.device_type, info.name
        );

        let Admission::Admitted(generation) = self.registry.admit(&device_id, info) else {
            return;
        };

        let session = HandshakeSession::new(
            device_id.clone(),
            generation,
            src,
            Arc::clone(&self.offer),
            Arc::clone(&self.registry),
            Arc::clone(&self.socket),
            self.policy,
        );
        let id = device_id.clone();
        let submitted = self.pool.submit(async move {
            let outcome = session.run().await;
            debug!("handshake session for dev {id} ended: {outcome:?}");
        });
        if !submitted {
            warn!("session pool closed; dropping candidate {device_id}");
            self.registry.evict_if(&device_id, generation);
        }
    }

    fn teardown(&self) {
        self.pool.shutdown();
        let evicted = self.registry.evict_all_connecting();
        if !evicted.is_empty() {
            info!("evicted {} connecting devices on teardown", evicted.len());
        }
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
