//! Domain entities for auto-networking.
//!
//! Pure data with no infrastructure dependencies.  Both roles share these
//! types: the broadcaster announces a [`device::DeviceInfo`] and the
//! coordinator stores it in its registry.

/// Device identity and static attributes.
pub mod device;
