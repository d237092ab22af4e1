//! Request Handling Module
//!
//! This module maps parsed HTTP requests onto the storage engine and
//! builds the responses.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  HTTP Parser    │  (http module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   ApiHandler    │  (this module)
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Default TTL  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  ShardedStore   │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

// Re-export the main handler
pub use handler::{ApiError, ApiHandler, GetResponse, SetRequest};
