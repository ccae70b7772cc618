//! Infrastructure layer for the coordinator.
//!
//! Contains OS-facing adapters: the UDP socket loop and its session pool,
//! the TOML config file reader, and the stdin control console.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `autonet_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod control;
pub mod network;
pub mod storage;
