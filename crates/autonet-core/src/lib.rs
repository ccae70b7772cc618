//! # autonet-core
//!
//! Shared library for LAN auto-networking containing the datagram wire codec
//! and the device types exchanged between the two protocol roles.
//!
//! This crate is used by both the coordinator service and the broadcaster
//! client.  It has zero dependencies on sockets, async runtimes, or OS APIs.
//!
//! # Architecture overview (for beginners)
//!
//! Auto-networking lets a device that has just joined a LAN find the service
//! that coordinates it, without any manual IP configuration:
//!
//! 1. The device (the *broadcaster*) repeatedly sends an `Announcement`
//!    datagram to the LAN broadcast address.
//! 2. The *coordinator* hears it, records the device as "connecting", and
//!    keeps replying with a `RendezvousOffer` that carries the URI of a
//!    long-lived messaging channel.
//! 3. The device switches to that channel; once the channel reports the device
//!    as present, the coordinator marks it "connected".
//!
//! This crate defines:
//!
//! - **`protocol`** – How the datagrams are laid out.  Payloads use *caps*, a
//!   small self-describing format where every field carries a type tag, so a
//!   decoder can reject a wrong or truncated payload instead of misreading it.
//!
//! - **`domain`** – The `DeviceInfo` record a device announces about itself.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `autonet_core::Announcement` instead of `autonet_core::protocol::messages::Announcement`.
pub use domain::device::{DeviceId, DeviceInfo};
pub use protocol::caps::{Caps, CapsError, CapsReader};
pub use protocol::messages::{Announcement, ProtocolError, RendezvousOffer};
