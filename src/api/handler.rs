//! Request Handler
//!
//! Translates HTTP requests into store operations and store results into
//! HTTP responses. Input validation and the default TTL live here, not in
//! the store.
//!
//! ## Endpoints
//!
//! ```text
//! POST /set   {"key": "k", "value": "v", "ttl": <nanoseconds>}
//!             200                       stored
//!             400 Invalid request body  body is not the JSON above
//!             400 Key is missing        empty key
//!
//! GET  /get?key=k
//!             200 {"key":"k","value":"v"}
//!             400 Key param is missing
//!             404 key not found         never set, or expired
//! ```
//!
//! `ttl` is an integer count of nanoseconds. Zero or absent means "use the
//! server default".

use crate::http::{HttpRequest, HttpResponse, Method, StatusCode};
use crate::storage::ShardedStore;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Body of a `/set` request.
#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    /// Time to live in nanoseconds; 0 selects the server default
    #[serde(default)]
    pub ttl: u64,
}

/// Body of a successful `/get` response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

/// Request-level failures, each mapped to one status code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid request body")]
    InvalidBody(String),

    #[error("Key is missing")]
    MissingKey,

    #[error("Key param is missing")]
    MissingKeyParam,

    #[error("key not found")]
    KeyNotFound,

    #[error("method not allowed")]
    MethodNotAllowed { allow: &'static str },

    #[error("404 page not found")]
    UnknownPath,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::MissingKey | ApiError::MissingKeyParam => {
                StatusCode::BadRequest
            }
            ApiError::KeyNotFound | ApiError::UnknownPath => StatusCode::NotFound,
            ApiError::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        let response = HttpResponse::error(self.status(), &self.to_string());
        match self {
            ApiError::MethodNotAllowed { allow } => response.with_header("Allow", allow),
            _ => response,
        }
    }
}

/// Dispatches requests to the `/set` and `/get` handlers.
#[derive(Debug, Clone)]
pub struct ApiHandler {
    /// The storage engine
    store: Arc<ShardedStore>,
    /// TTL applied when a request carries none
    default_ttl: Duration,
}

impl ApiHandler {
    /// Creates a new handler over `store`.
    pub fn new(store: Arc<ShardedStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Executes a request and returns the response to send back.
    pub fn execute(&self, request: &HttpRequest) -> HttpResponse {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                debug!(path = %request.path, method = %request.method, error = ?e, "Request rejected");
                e.into_response()
            }
        }
    }

    fn dispatch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        match (request.path.as_str(), &request.method) {
            ("/set", Method::Post | Method::Put) => self.handle_set(request),
            ("/set", _) => Err(ApiError::MethodNotAllowed { allow: "POST, PUT" }),
            ("/get", Method::Get | Method::Head) => self.handle_get(request),
            ("/get", _) => Err(ApiError::MethodNotAllowed { allow: "GET, HEAD" }),
            _ => Err(ApiError::UnknownPath),
        }
    }

    fn handle_set(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let body: SetRequest = serde_json::from_slice(&request.body)
            .map_err(|e| ApiError::InvalidBody(e.to_string()))?;

        if body.key.is_empty() {
            return Err(ApiError::MissingKey);
        }

        let ttl = match body.ttl {
            0 => self.default_ttl,
            nanos => Duration::from_nanos(nanos),
        };

        self.store
            .set(Bytes::from(body.key), Bytes::from(body.value), ttl);

        Ok(HttpResponse::ok())
    }

    fn handle_get(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let key = match request.query_param("key") {
            Some(key) if !key.is_empty() => key,
            _ => return Err(ApiError::MissingKeyParam),
        };

        let value = self
            .store
            .get(&Bytes::copy_from_slice(key.as_bytes()))
            .ok_or(ApiError::KeyNotFound)?;

        Ok(HttpResponse::json(&GetResponse {
            key: key.to_string(),
            value: String::from_utf8_lossy(&value).into_owned(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::parse_request;
    use std::thread;

    fn create_handler() -> ApiHandler {
        let store = Arc::new(ShardedStore::new(4, 2));
        ApiHandler::new(store, Duration::from_secs(300))
    }

    fn make_request(raw: &str) -> HttpRequest {
        let (request, _) = parse_request(raw.as_bytes()).unwrap().unwrap();
        request
    }

    fn set_request(body: &str) -> HttpRequest {
        make_request(&format!(
            "POST /set HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
    }

    fn get_request(key: &str) -> HttpRequest {
        make_request(&format!("GET /get?key={} HTTP/1.1\r\n\r\n", key))
    }

    #[test]
    fn test_set_get() {
        let handler = create_handler();

        let response = handler.execute(&set_request(r#"{"key":"name","value":"Ada"}"#));
        assert_eq!(response.status, StatusCode::Ok);
        assert!(response.body.is_empty());

        let response = handler.execute(&get_request("name"));
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.content_type, Some("application/json"));
        let body: GetResponse = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(
            body,
            GetResponse {
                key: "name".to_string(),
                value: "Ada".to_string()
            }
        );
    }

    #[test]
    fn test_get_nonexistent() {
        let handler = create_handler();

        let response = handler.execute(&get_request("nonexistent"));
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(&response.body[..], b"key not found\n");
    }

    #[test]
    fn test_get_missing_key_param() {
        let handler = create_handler();

        let response = handler.execute(&make_request("GET /get HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(&response.body[..], b"Key param is missing\n");

        let response = handler.execute(&get_request(""));
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_set_invalid_body() {
        let handler = create_handler();

        let response = handler.execute(&set_request("not json"));
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(&response.body[..], b"Invalid request body\n");

        // Negative durations are not representable
        let response = handler.execute(&set_request(r#"{"key":"k","value":"v","ttl":-1}"#));
        assert_eq!(response.status, StatusCode::BadRequest);
    }

    #[test]
    fn test_set_missing_key() {
        let handler = create_handler();

        let response = handler.execute(&set_request(r#"{"key":"","value":"v"}"#));
        assert_eq!(response.status, StatusCode::BadRequest);
        assert_eq!(&response.body[..], b"Key is missing\n");
    }

    #[test]
    fn test_set_with_ttl_expires() {
        let handler = create_handler();

        // 50ms in nanoseconds
        let response = handler.execute(&set_request(
            r#"{"key":"temp","value":"v","ttl":50000000}"#,
        ));
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(handler.execute(&get_request("temp")).status, StatusCode::Ok);

        thread::sleep(Duration::from_millis(100));

        assert_eq!(
            handler.execute(&get_request("temp")).status,
            StatusCode::NotFound
        );
    }

    #[test]
    fn test_zero_ttl_uses_default() {
        let store = Arc::new(ShardedStore::new(2, 1));
        let handler = ApiHandler::new(Arc::clone(&store), Duration::from_millis(50));

        handler.execute(&set_request(r#"{"key":"k","value":"v","ttl":0}"#));
        assert_eq!(store.get(&Bytes::from("k")), Some(Bytes::from("v")));

        thread::sleep(Duration::from_millis(100));

        // The default was applied, so the key is gone rather than permanent
        assert_eq!(store.get(&Bytes::from("k")), None);
    }

    #[test]
    fn test_percent_encoded_key() {
        let handler = create_handler();

        handler.execute(&set_request(r#"{"key":"user:42 a","value":"v"}"#));
        let response = handler.execute(&get_request("user%3A42+a"));
        assert_eq!(response.status, StatusCode::Ok);
        let body: GetResponse = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body.key, "user:42 a");
    }

    #[test]
    fn test_method_not_allowed() {
        let handler = create_handler();

        let response = handler.execute(&make_request("GET /set HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
        assert!(response
            .headers
            .contains(&("Allow", "POST, PUT".to_string())));

        let response = handler.execute(&make_request("DELETE /get?key=a HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status, StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_unknown_path() {
        let handler = create_handler();

        let response = handler.execute(&make_request("GET /nope HTTP/1.1\r\n\r\n"));
        assert_eq!(response.status, StatusCode::NotFound);
        assert_eq!(&response.body[..], b"404 page not found\n");
    }
}
