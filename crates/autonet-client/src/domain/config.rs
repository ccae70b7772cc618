//! Broadcaster configuration value object.
//!
//! A [`BroadcasterConfig`] carries the device identity announced on the LAN
//! and the cadence of the announcements.  It is checked once with
//! [`BroadcasterConfig::validate`] when the broadcaster is constructed.
//!
//! `device_id` defaults to the empty string, which `validate` rejects; the
//! binary fills it with a fresh UUID when neither the file nor the command
//! line provides one.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use autonet_core::DeviceInfo;
use serde::Deserialize;
use thiserror::Error;

/// Reasons a [`BroadcasterConfig`] is rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("device id must not be empty")]
    MissingDeviceId,
    #[error("broadcast_interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("max_attempts must be at least 1 when set")]
    ZeroAttempts,
}

/// All runtime configuration for the broadcaster role.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BroadcasterConfig {
    /// UDP port the coordinator listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Wait for a reply this long before announcing again.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    #[serde(default)]
    pub device_id: String,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default)]
    pub device_type: u32,
    /// Destination address of the announcements.
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: IpAddr,
    /// Give up after this many announcements.  `None` retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    37800
}
fn default_broadcast_interval_ms() -> u64 {
    10_000
}
fn default_device_name() -> String {
    "autonet-device".to_string()
}
fn default_broadcast_addr() -> IpAddr {
    IpAddr::V4(Ipv4Addr::BROADCAST)
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            device_id: String::new(),
            device_name: default_device_name(),
            device_type: 0,
            broadcast_addr: default_broadcast_addr(),
            max_attempts: None,
        }
    }
}

impl BroadcasterConfig {
    /// Checks that the configuration can drive a discovery run.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::MissingDeviceId);
        }
        if self.broadcast_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(())
    }

    /// Where announcements are sent.
    pub fn target_addr(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_addr, self.port)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo::new(self.device_type, self.device_name.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
