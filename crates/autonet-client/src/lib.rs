//! autonet-client library entry point.
//!
//! The broadcaster side of LAN auto-networking: a device announces its
//! identity by UDP broadcast until a coordinator replies with the rendezvous
//! URI of the messaging service, then starts its messaging agent on that URI.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::discovery::{
    AgentError, Broadcaster, DiscoveryError, DiscoveryState, DiscoveryTransport, MessagingAgent,
};
pub use domain::{BroadcasterConfig, ConfigError};
pub use infrastructure::network::{TransportError, UdpBroadcastTransport};
