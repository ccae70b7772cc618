//! Coordinator configuration value object.
//!
//! [`CoordinatorConfig`] is the single source of truth for the coordinator's
//! runtime settings.  It is built once at startup (from a TOML file, CLI
//! flags, or defaults), checked with [`CoordinatorConfig::validate`] when the
//! coordinator is constructed, and never mutated afterwards: the coordinator
//! keeps it behind an `Arc` shared read-only with every handshake session.
//!
//! # Serde default values
//!
//! Every field has a `#[serde(default = ...)]` helper, so a config file only
//! needs the keys it wants to change.  `rendezvous_uri` defaults to the empty
//! string, which `validate` rejects: there is no sensible URI to guess.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Reasons a [`CoordinatorConfig`] is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("rendezvous URI must not be empty")]
    MissingRendezvousUri,
    #[error("max_sessions must be at least 1")]
    NoSessions,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// All runtime configuration for the coordinator role.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CoordinatorConfig {
    /// UDP port announcements arrive on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Local address to bind.  `0.0.0.0` listens on every interface.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// URI of the messaging service offered to every candidate device.
    #[serde(default)]
    pub rendezvous_uri: String,
    /// Upper bound on concurrently running handshake sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// How long a candidate may stay in `connecting` before it is evicted.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Delay between two rendezvous offers to the same candidate.
    #[serde(default = "default_handshake_interval_ms")]
    pub handshake_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    37800
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_max_sessions() -> usize {
    4
}
fn default_handshake_timeout_ms() -> u64 {
    20_000
}
fn default_handshake_interval_ms() -> u64 {
    1_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            rendezvous_uri: String::new(),
            max_sessions: default_max_sessions(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            handshake_interval_ms: default_handshake_interval_ms(),
        }
    }
}

impl CoordinatorConfig {
    /// Checks that the configuration can drive a coordinator.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rendezvous_uri.trim().is_empty() {
            return Err(ConfigError::MissingRendezvousUri);
        }
        if self.max_sessions == 0 {
            return Err(ConfigError::NoSessions);
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("handshake_timeout_ms"));
        }
        if self.handshake_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("handshake_interval_ms"));
        }
        Ok(())
    }

    /// The socket address the coordinator binds.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn handshake_interval(&self) -> Duration {
        Duration::from_millis(self.handshake_interval_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
