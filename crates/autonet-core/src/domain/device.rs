//! Device identity types.

use std::fmt;

/// Unique identifier a device announces for itself.
///
/// Device ids are opaque strings chosen by the device (typically a serial
/// number or a UUID).  The coordinator only compares them for equality.
pub type DeviceId = String;

/// Static attributes announced by a device.
///
/// Immutable once received for a given handshake attempt: a later
/// announcement with different attributes is ignored while the first one is
/// still connecting or connected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Application-defined device class (speaker, lamp, ...).
    pub device_type: u32,
    /// Human-readable device name.
    pub name: String,
}

impl DeviceInfo {
    /// Creates a new `DeviceInfo`.
    pub fn new(device_type: u32, name: impl Into<String>) -> Self {
        Self {
            device_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type {})", self.name, self.device_type)
    }
}
