//! Network infrastructure for the coordinator.
//!
//! # Sub-modules
//!
//! - **`coordinator`** – Binds the UDP discovery socket, decodes incoming
//!   announcements, admits new devices into the registry, and hands each one
//!   a handshake session that sends the rendezvous offer from the same socket.
//!
//! - **`pool`** – The bounded [`pool::SessionPool`] those sessions run on.
//!   It is built around an explicit runtime handle and injected into the
//!   coordinator.

pub mod coordinator;
pub mod pool;
