//! Handle table: live file handles mapped to their access profiles.

use std::time::Duration;

use crate::profile::AccessProfile;
use crate::table::{InsertRejected, KeyedTable};

/// Why a registration was rejected. Either way the profile comes back to the
/// caller, which is the only owner left to discard it.
#[derive(Debug)]
pub enum RegisterError {
    /// The handle already has a live profile; registering again would break
    /// the one-record-per-handle invariant.
    AlreadyRegistered(AccessProfile),
    /// The table reached its configured capacity.
    Full(AccessProfile),
}

/// Maps each open, monitored handle to exclusive ownership of its profile.
///
/// A handle is present exactly while it is open and not yet closed; removal
/// at close hands the profile back for forwarding to the transfer queue.
pub struct HandleTable {
    table: KeyedTable<u64, AccessProfile>,
}

impl HandleTable {
    /// Creates a table with the given shard/bucket geometry and entry cap.
    pub fn new(shards: usize, buckets_per_shard: usize, max_entries: usize) -> Self {
        Self {
            table: KeyedTable::new(shards, buckets_per_shard, max_entries),
        }
    }

    /// Registers a profile for a freshly opened handle.
    pub fn register(&self, handle: u64, profile: AccessProfile) -> Result<(), RegisterError> {
        self.table
            .insert_if_absent(handle, profile)
            .map_err(|rejected| match rejected {
                InsertRejected::Occupied(profile) => RegisterError::AlreadyRegistered(profile),
                InsertRejected::Full(profile) => RegisterError::Full(profile),
            })
    }

    /// Folds one completed read into the handle's profile, atomically with
    /// the lookup. Returns `false` for an unknown handle.
    pub fn record_read(&self, handle: u64, bytes: u64, elapsed: Duration) -> bool {
        self.table
            .with_value_mut(&handle, |profile| profile.record_read(bytes, elapsed))
            .is_some()
    }

    /// Folds one completed write into the handle's profile, atomically with
    /// the lookup. Returns `false` for an unknown handle.
    pub fn record_write(&self, handle: u64, bytes: u64, elapsed: Duration) -> bool {
        self.table
            .with_value_mut(&handle, |profile| profile.record_write(bytes, elapsed))
            .is_some()
    }

    /// Removes the handle and hands back exclusive ownership of its profile.
    pub fn unregister(&self, handle: u64) -> Option<AccessProfile> {
        self.table.remove(&handle)
    }

    /// Number of currently open monitored handles.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HandleTable {
        HandleTable::new(4, 16, 1024)
    }

    #[test]
    fn test_register_then_unregister_returns_profile() {
        let handles = table();
        let profile = AccessProfile::new(42, "/a", String::new());

        handles.register(7, profile).expect("register");
        assert_eq!(handles.len(), 1);

        let removed = handles.unregister(7).expect("profile back");
        assert_eq!(removed.pid(), 42);
        assert_eq!(removed.path(), "/a");
        assert!(handles.is_empty());
    }

    #[test]
    fn test_double_register_keeps_first_profile() {
        let handles = table();
        handles
            .register(7, AccessProfile::new(1, "/first", String::new()))
            .expect("first register");

        let second = AccessProfile::new(2, "/second", String::new());
        match handles.register(7, second) {
            Err(RegisterError::AlreadyRegistered(rejected)) => {
                assert_eq!(rejected.path(), "/second");
            }
            other => panic!("expected AlreadyRegistered, got {other:?}"),
        }

        let kept = handles.unregister(7).expect("profile back");
        assert_eq!(kept.path(), "/first");
    }

    #[test]
    fn test_record_accumulates_in_place() {
        let handles = table();
        handles
            .register(7, AccessProfile::new(1, "/a", String::new()))
            .expect("register");

        assert!(handles.record_read(7, 100, Duration::from_micros(2_000)));
        assert!(handles.record_read(7, 25, Duration::from_micros(500)));
        assert!(handles.record_write(7, 50, Duration::from_micros(1_000)));

        let profile = handles.unregister(7).expect("profile back");
        assert_eq!(profile.read().bytes(), 125);
        assert_eq!(profile.read().elapsed_subsec_micros(), 2_500);
        assert_eq!(profile.write().bytes(), 50);
    }

    #[test]
    fn test_unknown_handle_is_reported() {
        let handles = table();
        assert!(!handles.record_read(99, 1, Duration::ZERO));
        assert!(!handles.record_write(99, 1, Duration::ZERO));
        assert!(handles.unregister(99).is_none());
    }

    #[test]
    fn test_capacity_rejection_returns_profile() {
        let handles = HandleTable::new(1, 4, 1);
        handles
            .register(1, AccessProfile::new(1, "/a", String::new()))
            .expect("register");

        match handles.register(2, AccessProfile::new(2, "/b", String::new())) {
            Err(RegisterError::Full(rejected)) => assert_eq!(rejected.path(), "/b"),
            other => panic!("expected Full, got {other:?}"),
        }
    }
}
