//! # shardkv - A Sharded In-Memory Key-Value Store
//!
//! shardkv is an in-memory key-value store with per-entry TTL expiry,
//! fixed horizontal sharding and per-key reader/writer locks. A small
//! HTTP/1.1 front end exposes it as `/set` and `/get`.
//!
//! ## Features
//!
//! - **Fixed Sharding**: FNV-1a routes each key to exactly one shard
//! - **Per-Key Locking**: Readers and writers of different keys never contend
//! - **Lazy TTL Expiry**: Expired keys are removed when read, or on an explicit sweep
//! - **HTTP Front End**: JSON over HTTP/1.1 on Tokio, with keep-alive
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              shardkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│ ApiHandler  │                  │
//! │  │ (Listener)  │    │  Handler    │    │ /set  /get  │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐    │
//! │  │   HTTP      │    │              ShardedStore                    │    │
//! │  │   Parser    │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │    │
//! │  │             │    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │    │
//! │  └─────────────┘    │  │per-key │ │per-key │ │per-key │ │shards  │ │    │
//! │                     │  │RwLocks │ │RwLocks │ │RwLocks │ │        │ │    │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │    │
//! │                     └──────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Library Use
//!
//! ```
//! use shardkv::ShardedStore;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = ShardedStore::new(2, 1);
//! store.set(Bytes::from("k1"), Bytes::from("v1"), Duration::from_secs(10));
//! store.set(Bytes::from("k2"), Bytes::from("v2"), Duration::from_secs(10));
//!
//! assert_eq!(store.get(&Bytes::from("k1")), Some(Bytes::from("v1")));
//! assert_eq!(store.get(&Bytes::from("k3")), None);
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Sharded store, per-key lock registry and hash router
//! - [`http`]: HTTP/1.1 request parser and response types
//! - [`api`]: `/set` and `/get` request handling
//! - [`connection`]: Client connection management
//! - [`config`]: Store and server configuration
//!
//! ## Replicas
//!
//! The store accepts a replica count for configuration compatibility. It is
//! reported but nothing is replicated.

pub mod api;
pub mod config;
pub mod connection;
pub mod http;
pub mod storage;

// Re-export commonly used types for convenience
pub use api::ApiHandler;
pub use config::{ServerConfig, StoreConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use http::{HttpParseError, HttpRequest, HttpResponse};
pub use storage::{ShardRouter, ShardedStore, StoreStats};

/// The default port shardkv listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host shardkv binds to (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default number of shards
pub const DEFAULT_SHARDS: usize = 4;

/// Default replica count (recorded only)
pub const DEFAULT_REPLICAS: usize = 2;

/// TTL in seconds applied to `/set` requests that carry none (5 minutes)
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Version of shardkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
