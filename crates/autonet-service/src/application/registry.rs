//! DeviceRegistry: the coordinator's authoritative record of device state.
//!
//! Every device the coordinator knows about is in exactly one of two maps:
//!
//! ```text
//!   announce            networking_complete           disconnect
//! ──────────► connecting ───────────────────► connected ──────────► (gone)
//!                 │
//!                 └── timeout / cancel ──► (gone)
//! ```
//!
//! - `connecting`: a handshake session is currently offering the rendezvous
//!   URI to the device.
//! - `connected`: the messaging service reported the device as present.
//!
//! # Locking
//!
//! Both maps live behind one `std::sync::Mutex`.  Every public method takes
//! the lock once, does its whole check-and-mutate step, and releases it before
//! returning, so callers never see a half-applied transition and can never
//! race a check against a later mutation.  The raw maps are never handed out.
//!
//! The lock is never held across an `.await`, so a blocking mutex is the
//! right tool even though handshake sessions are async tasks.
//!
//! # Generations
//!
//! Each admission is stamped with a fresh [`Generation`].  Handshake sessions
//! query and evict through [`DeviceRegistry::session_state`] and
//! [`DeviceRegistry::evict_if`], so a session outliving its admission never
//! touches a later admission of the same device id.
//!
//! # BTreeMap choice
//!
//! `get_devices` snapshots are returned sorted by device id, which keeps logs
//! and test assertions stable.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use autonet_core::{DeviceId, DeviceInfo};
use tracing::{debug, info};

/// Identifies one admission of a device into `connecting`.
///
/// A device that leaves the registry and announces again gets a new
/// generation, so a session started for an earlier admission can tell that
/// the current entry is not its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Result of offering an announced device to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The device was inserted into `connecting`; a session must be started
    /// for this generation.
    Admitted(Generation),
    /// Duplicate announcement from a device that already completed.
    AlreadyConnected,
    /// Duplicate announcement while a session is in flight.
    AlreadyConnecting,
}

/// Where a device currently stands, as seen by a handshake session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Connecting,
    Connected,
    Unknown,
}

#[derive(Debug, Clone)]
struct Entry {
    info: DeviceInfo,
    generation: Generation,
}

#[derive(Debug, Default)]
struct Maps {
    connecting: BTreeMap<DeviceId, Entry>,
    connected: BTreeMap<DeviceId, Entry>,
    next_generation: u64,
}

/// Thread-safe registry of connecting and connected devices.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    maps: Mutex<Maps>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps half-updated (each
    // method performs at most one insert/remove pair), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Maps> {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admits an announced device into `connecting` unless it is already
    /// known.  Check and insert happen under one lock acquisition.
    pub fn admit(&self, device_id: &str, info: DeviceInfo) -> Admission {
        let mut maps = self.lock();
        if maps.connected.contains_key(device_id) {
            debug!("device [{device_id}] {} already connected", info.name);
            return Admission::AlreadyConnected;
        }
        if maps.connecting.contains_key(device_id) {
            debug!("device [{device_id}] {} is connecting", info.name);
            return Admission::AlreadyConnecting;
        }
        let generation = Generation(maps.next_generation);
        maps.next_generation += 1;
        maps.connecting
            .insert(device_id.to_owned(), Entry { info, generation });
        Admission::Admitted(generation)
    }

    /// Moves a device from `connecting` to `connected`.
    ///
    /// Returns `false` (and changes nothing) when the device is not
    /// connecting: already completed, timed out, or never announced.
    pub fn networking_complete(&self, device_id: &str) -> bool {
        let mut maps = self.lock();
        match maps.connecting.remove(device_id) {
            Some(entry) => {
                maps.connected.insert(device_id.to_owned(), entry);
                info!("device {device_id} connected");
                true
            }
            None => false,
        }
    }

    /// Removes a device from `connected`.  No-op for unknown ids.
    pub fn disconnect(&self, device_id: &str) -> bool {
        let removed = self.lock().connected.remove(device_id).is_some();
        if removed {
            info!("erase device {device_id}");
        }
        removed
    }

    /// Removes a device from `connecting`, ending its handshake session at
    /// the session's next tick.  No-op when the device is not connecting.
    pub fn evict(&self, device_id: &str) -> bool {
        self.lock().connecting.remove(device_id).is_some()
    }

    /// Removes a device from `connecting` only while it is still in the
    /// admission `generation`.  A later admission of the same id is left alone.
    pub fn evict_if(&self, device_id: &str, generation: Generation) -> bool {
        let mut maps = self.lock();
        match maps.connecting.get(device_id) {
            Some(entry) if entry.generation == generation => {
                maps.connecting.remove(device_id);
                true
            }
            _ => false,
        }
    }

    /// Removes every device from `connecting` and returns their ids.
    pub fn evict_all_connecting(&self) -> Vec<DeviceId> {
        let drained = std::mem::take(&mut self.lock().connecting);
        drained.into_keys().collect()
    }

    /// Point-in-time copy of the connected devices, sorted by id.
    pub fn get_devices(&self) -> Vec<(DeviceId, DeviceInfo)> {
        self.lock()
            .connected
            .iter()
            .map(|(id, entry)| (id.clone(), entry.info.clone()))
            .collect()
    }

    /// Looks up which map holds `device_id`, under a single lock.
    pub fn state(&self, device_id: &str) -> DeviceState {
        let maps = self.lock();
        if maps.connecting.contains_key(device_id) {
            DeviceState::Connecting
        } else if maps.connected.contains_key(device_id) {
            DeviceState::Connected
        } else {
            DeviceState::Unknown
        }
    }

    /// Like [`state`](Self::state), but an entry from any other admission
    /// than `generation` reads as [`DeviceState::Unknown`].
    pub fn session_state(&self, device_id: &str, generation: Generation) -> DeviceState {
        let maps = self.lock();
        let owns = |entry: Option<&Entry>| entry.is_some_and(|e| e.generation == generation);
        if owns(maps.connecting.get(device_id)) {
            DeviceState::Connecting
        } else if owns(maps.connected.get(device_id)) {
            DeviceState::Connected
        } else {
            DeviceState::Unknown
        }
    }

    pub fn is_device_connecting(&self, device_id: &str) -> bool {
        self.lock().connecting.contains_key(device_id)
    }

    pub fn is_device_connected(&self, device_id: &str) -> bool {
        self.lock().connected.contains_key(device_id)
    }

    /// Number of devices with a handshake in flight.
    pub fn connecting_count(&self) -> usize {
        self.lock().connecting.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn info(name: &str) -> DeviceInfo {
        DeviceInfo::new(0, name)
    }

    #[test]
    fn test_admit_new_device_goes_to_connecting() {
        // Arrange
        let reg = DeviceRegistry::new();

        // Act
        let result = reg.admit("dev1", info("foo"));

        // Assert
        assert!(matches!(result, Admission::Admitted(_)));
        assert!(reg.is_device_connecting("dev1"));
        assert!(reg.get_devices().is_empty());
    }

    #[test]
    fn test_admit_duplicate_while_connecting_changes_nothing() {
        // Arrange
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));

        // Act: same id, different attributes
        let result = reg.admit("dev1", info("renamed"));

        // Assert
        assert_eq!(result, Admission::AlreadyConnecting);
        assert_eq!(reg.connecting_count(), 1);
        reg.networking_complete("dev1");
        assert_eq!(reg.get_devices()[0].1.name, "foo");
    }

    #[test]
    fn test_admit_duplicate_after_connected_is_rejected() {
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));
        reg.networking_complete("dev1");

        assert_eq!(reg.admit("dev1", info("foo")), Admission::AlreadyConnected);
        assert!(!reg.is_device_connecting("dev1"));
    }

    #[test]
    fn test_networking_complete_moves_device_to_connected() {
        // Arrange
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));

        // Act
        let moved = reg.networking_complete("dev1");

        // Assert
        assert!(moved);
        assert!(!reg.is_device_connecting("dev1"));
        assert_eq!(reg.get_devices(), vec![("dev1".to_string(), info("foo"))]);
        assert_eq!(reg.state("dev1"), DeviceState::Connected);
    }

    #[test]
    fn test_networking_complete_unknown_is_noop() {
        let reg = DeviceRegistry::new();
        assert!(!reg.networking_complete("ghost"));
        assert!(reg.get_devices().is_empty());
    }

    #[test]
    fn test_networking_complete_twice_is_idempotent() {
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));
        assert!(reg.networking_complete("dev1"));
        assert!(!reg.networking_complete("dev1"));
        assert_eq!(reg.get_devices().len(), 1);
    }

    #[test]
    fn test_disconnect_removes_connected_device() {
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));
        reg.networking_complete("dev1");

        assert!(reg.disconnect("dev1"));
        assert!(reg.get_devices().is_empty());
        assert_eq!(reg.state("dev1"), DeviceState::Unknown);
    }

    #[test]
    fn test_disconnect_unknown_is_noop() {
        // Arrange
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));

        // Act
        let removed = reg.disconnect("ghost");

        // Assert
        assert!(!removed);
        assert!(reg.is_device_connecting("dev1"));
    }

    #[test]
    fn test_disconnect_does_not_touch_connecting() {
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));

        assert!(!reg.disconnect("dev1"));
        assert!(reg.is_device_connecting("dev1"));
    }

    #[test]
    fn test_disconnected_device_can_be_admitted_again() {
        let reg = DeviceRegistry::new();
        reg.admit("dev1", info("foo"));
        reg.networking_complete("dev1");
        reg.disconnect("dev1");

        assert!(matches!(reg.admit("dev1", info("foo")), Admission::Admitted(_)));
    }

    fn generation(admission: Admission) -> Generation {
        match admission {
            Admission::Admitted(g) => g,
            other => panic!("expected admission, got {other:?}"),
        }
    }

    #[test]
    fn test_readmission_gets_a_new_generation() {
        // Arrange
        let reg = DeviceRegistry::new();
        let first = generation(reg.admit("dev1", info("foo")));
        reg.networking_complete("dev1");
        reg.disconnect("dev1");

        // Act
        let second = generation(reg.admit("dev1", info("foo")));

        // Assert
        assert_ne!(first, second);
        assert_eq!(reg.session_state("dev1", first), DeviceState::Unknown);
        assert_eq!(reg.session_state("dev1", second), DeviceState::Connecting);
    }

    #[test]
    fn test_evict_if_ignores_other_generation() {
        // Arrange: cancelled, then announced again
        let reg = DeviceRegistry::new();
        let stale = generation(reg.admit("dev1", info("foo")));
        reg.evict("dev1");
        let current = generation(reg.admit("dev1", info("foo")));

        // Act
        let evicted = reg.evict_if("dev1", stale);

        // Assert
        assert!(!evicted);
        assert!(reg.is_device_connecting("dev1"));
        assert!(reg.evict_if("dev1", current));
        assert!(!reg.is_device_connecting("dev1"));
    }

    #[test]
    fn test_session_state_follows_own_admission_into_connected() {
        let reg = DeviceRegistry::new();
        let g = generation(reg.admit("dev1", info("foo")));
        reg.networking_complete("dev1");

        assert_eq!(reg.session_state("dev1", g), DeviceState::Connected);
        assert_eq!(reg.state("dev1"), DeviceState::Connected);
    }

    #[test]
    fn test_evict_removes_only_connecting() {
        let reg = DeviceRegistry::new();
        reg.admit("a", info("a"));
        reg.admit("b", info("b"));
        reg.networking_complete("b");

        assert!(reg.evict("a"));
        assert!(!reg.evict("b"));
        assert_eq!(reg.state("a"), DeviceState::Unknown);
        assert_eq!(reg.state("b"), DeviceState::Connected);
    }

    #[test]
    fn test_evict_all_connecting_returns_ids_and_keeps_connected() {
        let reg = DeviceRegistry::new();
        reg.admit("b", info("b"));
        reg.admit("a", info("a"));
        reg.admit("c", info("c"));
        reg.networking_complete("c");

        let evicted = reg.evict_all_connecting();

        assert_eq!(evicted, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(reg.connecting_count(), 0);
        assert!(reg.is_device_connected("c"));
    }

    #[test]
    fn test_get_devices_is_sorted_snapshot() {
        let reg = DeviceRegistry::new();
        for id in ["zeta", "alpha", "mid"] {
            reg.admit(id, info(id));
            reg.networking_complete(id);
        }

        let snapshot = reg.get_devices();
        reg.disconnect("alpha");

        let ids: Vec<_> = snapshot.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["alpha", "mid", "zeta"]);
        assert_eq!(reg.get_devices().len(), 2);
    }

    #[test]
    fn test_concurrent_mutations_never_place_device_in_both_maps() {
        // Arrange: many threads hammer the same few ids with every operation.
        let reg = Arc::new(DeviceRegistry::new());
        let ids = ["d0", "d1", "d2", "d3"];

        // Act
        let workers: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..2000 {
                        let id = ids[(i + t) % ids.len()];
                        match (i * 7 + t) % 4 {
                            0 => {
                                reg.admit(id, DeviceInfo::new(t as u32, id));
                            }
                            1 => {
                                reg.networking_complete(id);
                            }
                            2 => {
                                reg.disconnect(id);
                            }
                            _ => {
                                reg.evict(id);
                            }
                        }
                        let maps = reg.lock();
                        for id in ids {
                            assert!(
                                !(maps.connecting.contains_key(id)
                                    && maps.connected.contains_key(id)),
                                "{id} present in both maps"
                            );
                        }
                    }
                })
            })
            .collect();

        // Assert: any violation panics inside a worker
        for w in workers {
            w.join().expect("worker must not observe a broken invariant");
        }
    }
}
