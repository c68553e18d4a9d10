//! Process-wide registry of per-volume locks.
//!
//! Each volume key maps to exactly one lock for the lifetime of the
//! registry. The map itself sits behind a short synchronous lock that
//! only covers lookup and insertion; the per-volume locks are what
//! callers hold across the mount critical section.
//!
//! Entries are never evicted. A node that sees an unbounded stream of
//! distinct volume ids grows this map accordingly.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use volmount_common::types::VolumeKey;

/// Shared handle serializing every mount of one volume.
pub type VolumeLock = Arc<tokio::sync::Mutex<()>>;

/// Lazily populated map from [`VolumeKey`] to its [`VolumeLock`].
///
/// Create one per process and share it with every coordinator via `Arc`.
#[derive(Debug, Default)]
pub struct MutexRegistry {
    locks: Mutex<HashMap<VolumeKey, VolumeLock>>,
}

impl MutexRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `key`, creating and registering it on first use.
    ///
    /// Concurrent first calls for the same key observe the same handle.
    /// The returned lock is not acquired.
    pub fn acquire_lock(&self, key: &VolumeKey) -> VolumeLock {
        let mut locks = self.locks.lock();
        match locks.entry(key.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                tracing::debug!(volume = %key, "registering volume lock");
                Arc::clone(entry.insert(Arc::new(tokio::sync::Mutex::new(()))))
            }
        }
    }

    /// Number of volumes that have a lock.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no lock has been created yet.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
