//! Application layer of the coordinator.
//!
//! Use cases in this layer depend on abstractions (the [`handshake::OfferSender`]
//! trait) and on domain types, never on sockets or the runtime directly.
//!
//! # Sub-modules
//!
//! - **`registry`** – The [`registry::DeviceRegistry`]: `connecting` and
//!   `connected` device maps behind a single lock, exposing only atomic
//!   transitions.
//!
//! - **`handshake`** – The per-device [`handshake::HandshakeSession`] that
//!   keeps offering the rendezvous URI until the device confirms or the
//!   timeout elapses.

pub mod handshake;
pub mod registry;
