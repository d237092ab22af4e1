//! Connection Handler Module
//!
//! This module manages individual client connections to shardkv.
//! Each client connection is handled by its own async task, so slow
//! clients never hold up others.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Parse HTTP  │───>│ ApiHandler  │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send resp   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Keep-Alive**: HTTP/1.1 connections serve requests until closed
//! - **Pipelining**: Several requests in one TCP packet are answered in order
//! - **Statistics**: Tracks connection and request metrics
//!
//! ## Example
//!
//! ```ignore
//! use shardkv::api::ApiHandler;
//! use shardkv::connection::{handle_connection, ConnectionStats};
//! use shardkv::storage::ShardedStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let store = Arc::new(ShardedStore::new(4, 2));
//! let stats = Arc::new(ConnectionStats::new());
//! let api = ApiHandler::new(store, Duration::from_secs(300));
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, api, stats));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
