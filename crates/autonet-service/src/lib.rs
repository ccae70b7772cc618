//! autonet-service library entry point.
//!
//! The coordinator side of LAN auto-networking: it listens for device
//! announcements on a UDP port, offers each new device the rendezvous URI of
//! the messaging service until the device shows up there, and keeps the
//! registry of connecting and connected devices.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::registry::{Admission, DeviceRegistry, DeviceState, Generation};
pub use domain::{ConfigError, CoordinatorConfig};
pub use infrastructure::network::coordinator::{Coordinator, CoordinatorError};
pub use infrastructure::network::pool::SessionPool;
