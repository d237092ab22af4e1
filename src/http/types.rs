//! HTTP/1.1 Message Types
//!
//! The subset of HTTP/1.1 that the `/set` and `/get` endpoints need:
//! a parsed request with its decoded query string and body, and a response
//! that serializes itself with an explicit `Content-Length`.
//!
//! ## Response Format
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 29\r\n
//! \r\n
//! {"key":"name","value":"Ada"}
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// The CRLF line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Content type used for error bodies
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Content type used for JSON bodies
pub const APPLICATION_JSON: &str = "application/json";

/// Request methods the server distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// A fully received HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path component of the request target, without the query
    pub path: String,
    /// Percent-decoded query parameters in order of appearance
    pub query: Vec<(String, String)>,
    /// Minor version of HTTP/1.x
    pub minor_version: u8,
    /// Header names are stored lowercased
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpRequest {
    /// Returns the first value of query parameter `name`.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first value of header `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the connection should stay open after the response.
    ///
    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close.
    pub fn keep_alive(&self) -> bool {
        let connection = self.header("connection").map(str::to_ascii_lowercase);
        match connection.as_deref() {
            Some(value) if value.split(',').any(|t| t.trim() == "close") => false,
            Some(value) if value.split(',').any(|t| t.trim() == "keep-alive") => true,
            _ => self.minor_version >= 1,
        }
    }
}

/// Status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    RequestHeaderFieldsTooLarge,
    InternalServerError,
    NotImplemented,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::RequestHeaderFieldsTooLarge => 431,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

/// An HTTP response ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    /// Extra headers, written after Content-Type
    pub headers: Vec<(&'static str, String)>,
    pub body: Bytes,
    /// Whether to send `Connection: close` and hang up afterwards
    pub close: bool,
}

impl HttpResponse {
    /// Creates a `200 OK` response with an empty body.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::Ok,
            content_type: None,
            headers: Vec::new(),
            body: Bytes::new(),
            close: false,
        }
    }

    /// Creates a `200 OK` response carrying `value` as JSON.
    ///
    /// Falls back to a 500 response if serialization fails.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(mut body) => {
                // Newline-terminated, like a streaming JSON encoder
                body.push(b'\n');
                Self {
                    status: StatusCode::Ok,
                    content_type: Some(APPLICATION_JSON),
                    headers: Vec::new(),
                    body: Bytes::from(body),
                    close: false,
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to encode JSON response");
                Self::error(StatusCode::InternalServerError, "internal server error")
            }
        }
    }

    /// Creates a plain-text error response. The message is newline-terminated.
    pub fn error(status: StatusCode, message: &str) -> Self {
        let mut body = BytesMut::with_capacity(message.len() + 1);
        body.put_slice(message.as_bytes());
        body.put_u8(b'\n');
        Self {
            status,
            content_type: Some(TEXT_PLAIN),
            headers: Vec::new(),
            body: body.freeze(),
            close: false,
        }
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Marks the response as the last one on its connection.
    pub fn with_close(mut self) -> Self {
        self.close = true;
        self
    }

    /// Serializes the response into wire format.
    ///
    /// When `include_body` is false (HEAD requests) the headers still
    /// advertise the body's length but the body itself is omitted.
    pub fn serialize(&self, include_body: bool) -> Bytes {
        let mut buf = BytesMut::with_capacity(128 + self.body.len());

        buf.put_slice(format!("HTTP/1.1 {}", self.status).as_bytes());
        buf.put_slice(CRLF);

        if let Some(content_type) = self.content_type {
            put_header(&mut buf, "Content-Type", content_type);
        }
        for (name, value) in &self.headers {
            put_header(&mut buf, name, value);
        }
        put_header(&mut buf, "Content-Length", &self.body.len().to_string());
        if self.close {
            put_header(&mut buf, "Connection", "close");
        }
        buf.put_slice(CRLF);

        if include_body {
            buf.put_slice(&self.body);
        }

        buf.freeze()
    }
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(CRLF);
}
