//! Storage Engine Module
//!
//! This module provides the core storage functionality for shardkv:
//! a fixed set of shards, per-key reader/writer locks inside each shard,
//! and lazy TTL expiry.
//!
//! ## Architecture
//!
//! ```text
//!                 key
//!                  │
//!                  ▼
//!        ┌───────────────────┐
//!        │    ShardRouter    │   fnv1a_32(key) % shards
//!        └─────────┬─────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────────┐
//! │  Shard i                                    │
//! │  ┌─────────────────────────────────────┐    │
//! │  │ LockRegistry (Mutex, brief)         │    │
//! │  └──────────────┬──────────────────────┘    │
//! │                 ▼                           │
//! │  ┌─────────────────────────────────────┐    │
//! │  │ RwLock<Slot> for this key           │    │
//! │  │   entry: value + optional expiry    │    │
//! │  └─────────────────────────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use shardkv::storage::ShardedStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = ShardedStore::new(4, 2);
//!
//! // Zero TTL: never expires
//! store.set(Bytes::from("name"), Bytes::from("Ada"), Duration::ZERO);
//! assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("Ada")));
//!
//! // Expires after an hour
//! store.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Duration::from_secs(3600),
//! );
//! ```

pub mod engine;
pub mod registry;
pub mod router;

// Re-export commonly used types
pub use engine::{Entry, Shard, ShardRead, ShardedStore, StoreStats};
pub use registry::{KeyLock, LockRegistry, Slot};
pub use router::{fnv1a_32, ShardRouter};
