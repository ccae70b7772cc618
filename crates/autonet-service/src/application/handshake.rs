//! HandshakeSession: keeps offering the rendezvous URI to one candidate.
//!
//! One session runs per device admitted into `connecting`.  Every interval it:
//!
//! 1. Gives up if the elapsed time reached the handshake timeout, evicting the
//!    device from `connecting`.
//! 2. Stops quietly if its admission left `connecting` (it completed through
//!    the messaging service, or someone cancelled it).  A later admission of
//!    the same device id belongs to a different session.
//! 3. Otherwise sends the pre-encoded offer datagram and sleeps one interval.
//!
//! # Cooperative cancellation
//!
//! Nothing interrupts a sleeping session.  A session learns that its device
//! completed or was cancelled only at its next tick, by looking at the
//! registry, so the worst-case delay between confirmation and session exit is
//! one interval.  The timeout is the only unconditional way out.
//!
//! # Timing precision
//!
//! Elapsed time is counted in whole intervals and ignores how long the send
//! took, so the real time to eviction is slightly longer than the configured
//! timeout.  Offers are idempotent, so this coarse cadence is sufficient.
//!
//! # Architecture
//!
//! The session depends only on the [`OfferSender`] trait and the
//! [`DeviceRegistry`]; the UDP socket is injected by the infrastructure layer,
//! and tests inject a recording sender.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autonet_core::DeviceId;
use tracing::{debug, info, warn};

use crate::application::registry::{DeviceRegistry, DeviceState, Generation};
use crate::domain::CoordinatorConfig;

/// Trait for delivering an offer datagram to a candidate device.
#[async_trait]
pub trait OfferSender: Send + Sync {
    /// Sends `payload` to `peer`.
    async fn send_offer(&self, payload: &[u8], peer: SocketAddr) -> std::io::Result<()>;
}

/// Retry cadence shared by all sessions of one coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePolicy {
    /// Elapsed time after which the candidate is evicted.
    pub timeout: Duration,
    /// Pause between two offers.
    pub interval: Duration,
}

impl From<&CoordinatorConfig> for HandshakePolicy {
    fn from(cfg: &CoordinatorConfig) -> Self {
        Self {
            timeout: cfg.handshake_timeout(),
            interval: cfg.handshake_interval(),
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The device moved to `connected`.
    Confirmed,
    /// The device was removed from `connecting` without completing.
    Withdrawn,
    /// The timeout elapsed; the session evicted the device.
    TimedOut,
}

/// The per-device retry loop.
pub struct HandshakeSession<S: ?Sized> {
    device_id: DeviceId,
    generation: Generation,
    peer: SocketAddr,
    offer: Arc<[u8]>,
    registry: Arc<DeviceRegistry>,
    sender: Arc<S>,
    policy: HandshakePolicy,
}

impl<S: OfferSender + ?Sized> HandshakeSession<S> {
    pub fn new(
        device_id: DeviceId,
        generation: Generation,
        peer: SocketAddr,
        offer: Arc<[u8]>,
        registry: Arc<DeviceRegistry>,
        sender: Arc<S>,
        policy: HandshakePolicy,
    ) -> Self {
        Self {
            device_id,
            generation,
            peer,
            offer,
            registry,
            sender,
            policy,
        }
    }

    /// Runs the session until confirmation, withdrawal, or timeout.
    pub async fn run(self) -> SessionOutcome {
        let mut elapsed = Duration::ZERO;

        loop {
            if elapsed >= self.policy.timeout {
                self.registry.evict_if(&self.device_id, self.generation);
                info!("handshake timeout for dev {}", self.device_id);
                return SessionOutcome::TimedOut;
            }

            match self.registry.session_state(&self.device_id, self.generation) {
                DeviceState::Connecting => {}
                DeviceState::Connected => {
                    debug!("handshake for dev {} confirmed", self.device_id);
                    return SessionOutcome::Confirmed;
                }
                DeviceState::Unknown => {
                    debug!("handshake for dev {} withdrawn", self.device_id);
                    return SessionOutcome::Withdrawn;
                }
            }

            match self.sender.send_offer(&self.offer, self.peer).await {
                Ok(()) => debug!(
                    "send offer {} bytes to {}, time {}/{} ms",
                    self.offer.len(),
                    self.peer,
                    elapsed.as_millis(),
                    self.policy.timeout.as_millis()
                ),
                Err(e) => warn!("failed to send offer to {}: {e}", self.peer),
            }

            elapsed += self.policy.interval;
            tokio::time::sleep(self.policy.interval).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
