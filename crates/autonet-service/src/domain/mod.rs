//! Domain types for the coordinator.
//!
//! - **`config`** – [`CoordinatorConfig`], the validated, immutable settings
//!   value every other layer reads from.

pub mod config;

pub use config::{ConfigError, CoordinatorConfig};
