//! Broadcaster: announces this device until a coordinator answers.
//!
//! A discovery run walks a small state machine:
//!
//! ```text
//! Idle ──run_discovery──► Broadcasting ──offer──► Accepted
//!                              │
//!                              └── send/recv error, attempts exhausted ──► Failed
//! ```
//!
//! While broadcasting, each round sends the pre-encoded announcement and then
//! waits until one broadcast interval after the send for a reply.  A timeout
//! starts the next round.  A malformed reply is logged and the wait resumes
//! with whatever is left of the round, so stray datagrams never trigger an
//! extra announcement.  The
//! first well-formed rendezvous offer ends the run: the offered URI gets
//! `#<device-id>` appended and is handed to the [`MessagingAgent`].
//!
//! # Seams
//!
//! The broadcaster talks to the network only through [`DiscoveryTransport`]
//! and to the messaging layer only through [`MessagingAgent`], so the state
//! machine is tested without sockets.  The transport is moved into the run
//! and dropped when it ends, whatever the outcome.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use autonet_core::{Announcement, ProtocolError, RendezvousOffer};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::{BroadcasterConfig, ConfigError};

/// Datagram transport used by a discovery run.
#[async_trait]
pub trait DiscoveryTransport: Send {
    /// Sends one announcement to the broadcast destination.
    async fn send_announcement(&mut self, payload: &[u8]) -> std::io::Result<()>;

    /// Waits up to `wait` for one datagram.  `Ok(None)` means the wait
    /// elapsed without data.
    async fn recv_reply(&mut self, wait: Duration)
        -> std::io::Result<Option<(Vec<u8>, SocketAddr)>>;
}

/// Error type for messaging agent operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("agent failed to start: {0}")]
    Start(String),
}

/// The long-lived messaging client the device switches to once accepted.
#[cfg_attr(test, mockall::automock)]
pub trait MessagingAgent: Send {
    /// Connects the agent to `uri`.
    fn start(&mut self, uri: &str) -> Result<(), AgentError>;
}

/// Where a broadcaster stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Broadcasting,
    Accepted,
    Failed,
}

/// Why a discovery run (or broadcaster construction) failed.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid broadcaster configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode announcement: {0}")]
    Encode(#[from] ProtocolError),
    #[error("msg broadcast failed: {0}")]
    Send(#[source] std::io::Error),
    #[error("socket receive failed: {0}")]
    Recv(#[source] std::io::Error),
    #[error("no coordinator answered after {attempts} announcements")]
    Exhausted { attempts: u32 },
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// The broadcaster role.
pub struct Broadcaster<A> {
    config: BroadcasterConfig,
    payload: Vec<u8>,
    agent: A,
    state: DiscoveryState,
}

impl<A: MessagingAgent> Broadcaster<A> {
    /// Validates `config` and encodes the announcement once.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::Config`] for an invalid configuration,
    /// [`DiscoveryError::Encode`] if the identity cannot be encoded.
    pub fn new(config: BroadcasterConfig, agent: A) -> Result<Self, DiscoveryError> {
        config.validate()?;
        let payload =
            Announcement::new(config.device_id.as_str(), config.device_info()).encode()?;
        Ok(Self {
            config,
            payload,
            agent,
            state: DiscoveryState::Idle,
        })
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// The messaging agent, started once the run was accepted.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    pub fn config(&self) -> &BroadcasterConfig {
        &self.config
    }

    /// Announces until a coordinator offers a rendezvous URI, then starts
    /// the messaging agent on it.
    ///
    /// Returns the URI the agent was started with.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::Send`] / [`DiscoveryError::Recv`] on socket errors,
    /// [`DiscoveryError::Exhausted`] when `max_attempts` announcements went
    /// unanswered, [`DiscoveryError::Agent`] if the agent refuses the URI.
    pub async fn run_discovery<T: DiscoveryTransport>(
        &mut self,
        mut transport: T,
    ) -> Result<String, DiscoveryError> {
        self.state = DiscoveryState::Broadcasting;
        let result = self.broadcast_until_accepted(&mut transport).await;
        drop(transport);

        let result = result.and_then(|uri| {
            self.agent.start(&uri)?;
            Ok(uri)
        });
        self.state = match &result {
            Ok(uri) => {
                info!("messaging agent started on {uri}");
                DiscoveryState::Accepted
            }
            Err(e) => {
                error!("discovery failed: {e}");
                DiscoveryState::Failed
            }
        };
        result
    }

    async fn broadcast_until_accepted<T: DiscoveryTransport>(
        &self,
        transport: &mut T,
    ) -> Result<String, DiscoveryError> {
        let interval = self.config.broadcast_interval();
        let mut attempts: u32 = 0;

        loop {
            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    return Err(DiscoveryError::Exhausted { attempts });
                }
            }

            transport
                .send_announcement(&self.payload)
                .await
                .map_err(DiscoveryError::Send)?;
            attempts += 1;
            debug!("msg broadcast success, attempt {attempts}");

            if let Some(uri) = self.await_offer(transport, Instant::now() + interval).await? {
                return Ok(uri);
            }
        }
    }

    /// Waits for a well-formed offer until `deadline`.  Malformed replies are
    /// dropped without shortening or extending the round.
    async fn await_offer<T: DiscoveryTransport>(
        &self,
        transport: &mut T,
        deadline: Instant,
    ) -> Result<Option<String>, DiscoveryError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let (bytes, from) = match transport.recv_reply(remaining).await {
                Ok(Some(reply)) => reply,
                Ok(None) => return Ok(None),
                Err(e) if is_timeout_error(&e) => continue,
                Err(e) => return Err(DiscoveryError::Recv(e)),
            };
            debug!("msg received {} bytes from {from}", bytes.len());

            match RendezvousOffer::decode(&bytes) {
                Ok(offer) => {
                    info!("rendezvous uri = {}", offer.uri);
                    return Ok(Some(offer.device_uri(&self.config.device_id)));
                }
                Err(e) => warn!("received data invalid: {e}"),
            }
        }
    }
}

fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
