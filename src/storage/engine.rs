//! Sharded Storage Engine with Per-Key Locking
//!
//! This module implements the core storage engine for shardkv: a fixed set
//! of shards, each holding its keys behind dedicated per-key reader/writer
//! locks, with lazy TTL expiry.
//!
//! ## Design Decisions
//!
//! 1. **Fixed Sharding**: Keys are routed with FNV-1a modulo the shard count,
//!    which never changes for the lifetime of the store.
//! 2. **Per-Key Locks**: Inside a shard, every key has its own `RwLock`.
//!    Readers of one key never wait on writers of another.
//! 3. **Lazy Expiry**: Expired keys are detected and removed on access, or by
//!    an explicit [`ShardedStore::purge_expired`] call. Nothing runs in the background.
//! 4. **Zero TTL**: A zero TTL means the entry never expires.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ShardedStore                          │
//! │   route(key) = fnv1a(key) % N                                │
//! │  ┌────────────────┐ ┌────────────────┐ ┌────────────────┐    │
//! │  │    Shard 0     │ │    Shard 1     │ │   Shard N-1    │    │
//! │  │ LockRegistry   │ │ LockRegistry   │ │ LockRegistry   │    │
//! │  │  key -> RwLock │ │  key -> RwLock │ │  key -> RwLock │    │
//! │  └────────────────┘ └────────────────┘ └────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::config::StoreConfig;
use crate::storage::registry::{KeyLock, LockRegistry, Slot};
use crate::storage::router::ShardRouter;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry that expires `ttl` from now.
    ///
    /// A zero `ttl` creates an entry that never expires.
    pub fn new(value: Bytes, ttl: Duration) -> Self {
        let expires_at = if ttl.is_zero() {
            None
        } else {
            Instant::now().checked_add(ttl)
        };
        Self { value, expires_at }
    }

    /// Checks if this entry has expired.
    ///
    /// An entry is live strictly before its expiry instant.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Returns the time left before expiry, or None if the entry never expires.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// Result of inspecting a slot under a read guard.
enum Lookup {
    Hit(Bytes),
    Miss,
    Expired,
    Retired,
}

fn inspect(slot: &Slot) -> Lookup {
    if slot.retired {
        return Lookup::Retired;
    }
    match &slot.entry {
        Some(entry) if entry.is_expired() => Lookup::Expired,
        Some(entry) => Lookup::Hit(entry.value.clone()),
        None => Lookup::Miss,
    }
}

/// A single shard owning a partition of the key space.
#[derive(Debug, Default)]
pub struct Shard {
    registry: LockRegistry,
}

impl Shard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The per-key write lock is held for the whole mutation.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        self.set_with(key, value, ttl, || {})
    }

    /// Like [`Shard::set`], but runs `on_insert` under the write guard
    /// before a new key becomes visible to readers.
    fn set_with(&self, key: Bytes, value: Bytes, ttl: Duration, on_insert: impl FnOnce()) -> bool {
        loop {
            let lock = self.registry.lock_for(&key);
            let mut slot = lock.write();
            if slot.retired {
                // Deleted while we waited; fetch the replacement
                continue;
            }
            // Expiry counts from the moment the write lock is held
            let entry = Entry::new(value, ttl);
            let is_new = slot.entry.is_none();
            if is_new {
                on_insert();
            }
            slot.entry = Some(entry);
            return is_new;
        }
    }

    /// Reads the value for `key`.
    ///
    /// An expired entry is removed, together with its lock, before this
    /// returns [`ShardRead::Expired`].
    pub fn get(&self, key: &Bytes) -> ShardRead {
        loop {
            let Some(lock) = self.registry.find(key) else {
                return ShardRead::Miss;
            };

            let lookup = inspect(&lock.read());
            match lookup {
                Lookup::Hit(value) => return ShardRead::Hit(value),
                Lookup::Miss => return ShardRead::Miss,
                Lookup::Retired => continue,
                Lookup::Expired => {}
            }

            // The read guard is gone; re-check and delete under one write hold
            match self.remove_if_expired(key, &lock) {
                Removal::Removed => return ShardRead::Expired,
                Removal::Live(value) => return ShardRead::Hit(value),
                Removal::Absent => return ShardRead::Miss,
                Removal::Retired => continue,
            }
        }
    }

    /// Takes `lock`'s write guard and, if its entry is still expired, clears
    /// the slot and unregisters the lock.
    fn remove_if_expired(&self, key: &Bytes, lock: &KeyLock) -> Removal {
        let mut slot = lock.write();
        if slot.retired {
            return Removal::Retired;
        }
        match &slot.entry {
            Some(entry) if !entry.is_expired() => return Removal::Live(entry.value.clone()),
            Some(_) => {}
            None => return Removal::Absent,
        }
        slot.retire();
        self.registry.delete_key(key, lock);
        Removal::Removed
    }

    /// Removes every expired entry in this shard.
    ///
    /// Returns the number of keys removed.
    pub fn purge_expired(&self) -> u64 {
        let now = Instant::now();
        let mut removed = 0;

        for (key, lock) in self.registry.snapshot() {
            let expired = {
                let slot = lock.read();
                !slot.retired
                    && slot
                        .entry
                        .as_ref()
                        .map(|e| e.is_expired_at(now))
                        .unwrap_or(false)
            };
            if expired && matches!(self.remove_if_expired(&key, &lock), Removal::Removed) {
                removed += 1;
            }
        }

        removed
    }

    /// Returns the number of keys with a registered lock.
    ///
    /// Expired entries count until they are read or purged.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if the shard holds no keys.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

/// Outcome of a shard read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardRead {
    /// The key holds a live value
    Hit(Bytes),
    /// The key was never set (or was already removed)
    Miss,
    /// The key had expired and was removed by this read
    Expired,
}

enum Removal {
    Removed,
    Live(Bytes),
    Absent,
    Retired,
}

/// The main storage engine for shardkv.
///
/// Owns a fixed sequence of [`Shard`]s and routes every operation to exactly
/// one of them. Operations on keys in different shards never interact.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// threads or tasks. All operations are synchronous and thread-safe.
///
/// # Example
///
/// ```
/// use shardkv::storage::ShardedStore;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = ShardedStore::new(4, 2);
///
/// store.set(Bytes::from("name"), Bytes::from("Ada"), Duration::from_secs(60));
/// assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("Ada")));
/// assert_eq!(store.get(&Bytes::from("missing")), None);
/// ```
pub struct ShardedStore {
    /// Fixed set of shards, indexed by the router
    shards: Vec<Shard>,

    router: ShardRouter,

    /// Accepted for configuration compatibility; nothing is replicated
    replicas: usize,

    /// Statistics: total number of keys (approximate)
    key_count: AtomicU64,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: GETs that returned a value
    hit_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: number of expired keys cleaned up
    expired_count: AtomicU64,
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shards", &self.shards.len())
            .field("replicas", &self.replicas)
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl ShardedStore {
    /// Creates a store with `shards` shards.
    ///
    /// `replicas` is recorded and reported but has no effect on placement
    /// or durability.
    ///
    /// # Panics
    ///
    /// Panics if `shards` is 0
    pub fn new(shards: usize, replicas: usize) -> Self {
        let router = ShardRouter::new(shards);
        let shards = (0..shards).map(|_| Shard::new()).collect();

        Self {
            shards,
            router,
            replicas,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Creates a store from a [`StoreConfig`].
    pub fn with_config(config: StoreConfig) -> Self {
        Self::new(config.shards, config.replicas)
    }

    /// Returns the index of the shard that owns `key`.
    #[inline]
    pub fn shard_index(&self, key: &[u8]) -> usize {
        self.router.route(key)
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Sets a key-value pair that expires after `ttl`.
    ///
    /// A zero `ttl` stores the value without expiry. If the key already
    /// exists, its value and expiry are overwritten.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.shard_index(&key);
        trace!(shard, ttl = ?ttl, "set");

        // Counted before the entry is published, so an expiring reader
        // can never decrement ahead of this increment
        self.shards[shard].set_with(key, value, ttl, || {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        })
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired; the two cases
    /// are not distinguished. Expired keys are removed on access.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        match self.get_shard(key).get(key) {
            ShardRead::Hit(value) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            ShardRead::Expired => {
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                debug!(shard = self.shard_index(key), "expired key removed on read");
                None
            }
            ShardRead::Miss => None,
        }
    }

    /// Removes expired keys from every shard.
    ///
    /// This is never called automatically. Keys that are written once and
    /// never read again keep their lock until a sweep like this runs.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were cleaned up.
    pub fn purge_expired(&self) -> u64 {
        let cleaned: u64 = self.shards.iter().map(Shard::purge_expired).sum();

        if cleaned > 0 {
            self.key_count.fetch_sub(cleaned, Ordering::Relaxed);
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
            debug!(cleaned, "purged expired keys");
        }

        cleaned
    }

    /// Returns the number of shards.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the configured replica count.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Returns the number of stored keys, including expired keys that have
    /// not been read or purged yet.
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(Shard::is_empty)
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let gets = self.get_count.load(Ordering::Relaxed);
        let hits = self.hit_count.load(Ordering::Relaxed);
        StoreStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: gets,
            set_ops: self.set_count.load(Ordering::Relaxed),
            hits,
            misses: gets.saturating_sub(hits),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub keys: u64,
    pub get_ops: u64,
    pub set_ops: u64,
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
}
