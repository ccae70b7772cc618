//! Infrastructure layer for the broadcaster.
//!
//! Contains OS-facing adapters: the broadcast UDP socket, messaging agent
//! adapters, and the TOML config file reader.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `autonet_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod agent;
pub mod network;
pub mod storage;
