//! Domain types for the broadcaster.
//!
//! - **`config`** – [`BroadcasterConfig`], the device identity and retry
//!   cadence a discovery run uses.

pub mod config;

pub use config::{BroadcasterConfig, ConfigError};
