//! Application layer use cases for the broadcaster.
//!
//! - **`discovery`** – The [`discovery::Broadcaster`] state machine: announce
//!   the device identity, wait for a rendezvous offer, and hand the resulting
//!   URI to the injected messaging agent.  Sockets arrive through the
//!   [`discovery::DiscoveryTransport`] trait, implemented in the
//!   infrastructure layer.

pub mod discovery;
