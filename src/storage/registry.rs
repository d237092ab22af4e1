//! Per-Key Lock Registry
//!
//! Each shard keeps one reader/writer lock per key instead of a single
//! shard-wide lock. The lock also owns the key's [`Slot`], so holding the
//! lock is the only way to touch the entry.
//!
//! ```text
//! ┌───────────────────────── Shard ──────────────────────────┐
//! │  Mutex<HashMap<key, Arc<RwLock<Slot>>>>                  │
//! │     "a"  ──> RwLock { entry: Some(..), retired: false }  │
//! │     "b"  ──> RwLock { entry: Some(..), retired: false }  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry mutex is held only for the lookup or insert and is released
//! before the caller acquires the per-key lock. The one nested acquisition is
//! per-key write guard followed by the registry mutex (see [`LockRegistry::delete_key`]),
//! and nothing ever waits on a per-key lock while holding the registry mutex.
//!
//! ## Retirement
//!
//! A thread can obtain a key's lock from the registry and then block on it
//! while another thread deletes the key. When the waiting thread finally
//! acquires the lock, that lock is no longer registered. Deleting therefore
//! marks the slot `retired`, and every acquirer that sees a retired slot goes
//! back to the registry for the current lock.

use crate::storage::engine::Entry;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// The state guarded by a per-key lock.
#[derive(Debug, Default)]
pub struct Slot {
    /// The stored entry, `None` until the first write lands
    pub entry: Option<Entry>,
    /// Set once the lock has been removed from its registry
    pub retired: bool,
}

impl Slot {
    /// Clears the entry and marks the slot as no longer registered.
    pub fn retire(&mut self) -> Option<Entry> {
        self.retired = true;
        self.entry.take()
    }
}

/// A shared handle to one key's lock.
pub type KeyLock = Arc<RwLock<Slot>>;

/// Maps keys to their dedicated locks, creating them on demand.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<Bytes, KeyLock>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `key`, registering a fresh one if none exists.
    pub fn lock_for(&self, key: &Bytes) -> KeyLock {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(key) {
            return Arc::clone(lock);
        }
        let lock = KeyLock::default();
        locks.insert(key.clone(), Arc::clone(&lock));
        lock
    }

    /// Returns the lock for `key` if one is registered.
    ///
    /// Readers use this so that lookups of absent keys never grow the registry.
    pub fn find(&self, key: &Bytes) -> Option<KeyLock> {
        self.locks.lock().get(key).map(Arc::clone)
    }

    /// Unregisters `lock` for `key`.
    ///
    /// Callers hold `lock`'s write guard and have already retired the slot.
    /// The entry is only removed if `lock` is still the registered lock for
    /// `key`, so a stale handle can never evict its replacement.
    ///
    /// Returns `true` if the lock was removed.
    pub fn delete_key(&self, key: &Bytes, lock: &KeyLock) -> bool {
        let mut locks = self.locks.lock();
        match locks.get(key) {
            Some(current) if Arc::ptr_eq(current, lock) => {
                locks.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Returns the number of registered locks.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Returns true if no locks are registered.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }

    /// Copies out every registered `(key, lock)` pair.
    ///
    /// The registry mutex is released before the caller inspects any slot.
    pub fn snapshot(&self) -> Vec<(Bytes, KeyLock)> {
        self.locks
            .lock()
            .iter()
            .map(|(key, lock)| (key.clone(), Arc::clone(lock)))
            .collect()
    }
}
