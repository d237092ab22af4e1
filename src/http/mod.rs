//! HTTP/1.1 Implementation
//!
//! This module provides the minimal HTTP/1.1 support the server needs.
//!
//! ## Modules
//!
//! - `types`: Request, response and status code types, response serialization
//! - `parser`: Incremental request parser for incoming bytes
//!
//! ## Example
//!
//! ```
//! use shardkv::http::{parse_request, HttpResponse, StatusCode};
//!
//! let data = b"GET /get?key=name HTTP/1.1\r\nHost: localhost\r\n\r\n";
//! let (request, consumed) = parse_request(data).unwrap().unwrap();
//! assert_eq!(request.query_param("key"), Some("name"));
//! assert_eq!(consumed, data.len());
//!
//! let response = HttpResponse::error(StatusCode::NotFound, "key not found");
//! let bytes = response.serialize(true);
//! assert!(bytes.starts_with(b"HTTP/1.1 404 Not Found\r\n"));
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_request, HttpParseError, ParseResult};
pub use types::{HttpRequest, HttpResponse, Method, StatusCode};
