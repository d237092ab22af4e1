//! Incremental HTTP/1.1 Request Parser
//!
//! The parser works on whatever bytes have arrived so far and returns either:
//! - `Ok(Some((request, consumed)))` - A complete request, `consumed` bytes were used
//! - `Ok(None)` - Need more data, the request is incomplete
//! - `Err(HttpParseError)` - The bytes cannot be a valid request
//!
//! Only `Content-Length` framed bodies are accepted; chunked transfer
//! encoding is rejected.

use crate::http::types::{HttpRequest, Method};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpParseError {
    /// Request line is not `METHOD TARGET VERSION`
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    /// Only HTTP/1.0 and HTTP/1.1 are understood
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),

    /// Header line without a colon, or with an empty name
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Request head is not valid UTF-8
    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    /// Content-Length is not a non-negative integer
    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Request line plus headers exceed the limit
    #[error("request head too large (max: {max} bytes)")]
    HeadTooLarge { max: usize },

    /// Declared body exceeds the limit
    #[error("request body too large: {size} bytes (max: {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// Transfer encodings are not supported
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, HttpParseError>;

/// Maximum size of the request line plus headers (8 KB)
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

/// Maximum request body size (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Attempts to parse one request from the front of `buf`.
pub fn parse_request(buf: &[u8]) -> ParseResult<Option<(HttpRequest, usize)>> {
    let Some(head_len) = find_head_end(buf) else {
        if buf.len() > MAX_HEAD_SIZE {
            return Err(HttpParseError::HeadTooLarge { max: MAX_HEAD_SIZE });
        }
        return Ok(None);
    };
    if head_len > MAX_HEAD_SIZE {
        return Err(HttpParseError::HeadTooLarge { max: MAX_HEAD_SIZE });
    }

    let head = std::str::from_utf8(&buf[..head_len]).map_err(|_| HttpParseError::InvalidUtf8)?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let (method, target, minor_version) = parse_request_line(request_line)?;

    let mut headers = Vec::new();
    for line in lines {
        headers.push(parse_header(line)?);
    }

    let content_length = body_length(&headers)?;

    let body_start = head_len + HEAD_TERMINATOR.len();
    let total = body_start + content_length;
    if buf.len() < total {
        return Ok(None);
    }

    let (path, query) = split_target(target);

    let request = HttpRequest {
        method,
        path,
        query,
        minor_version,
        headers,
        body: Bytes::copy_from_slice(&buf[body_start..total]),
    };

    Ok(Some((request, total)))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
}

fn parse_request_line(line: &str) -> ParseResult<(Method, &str, u8)> {
    let mut parts = line.split(' ').filter(|p| !p.is_empty());
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpParseError::MalformedRequestLine(line.to_string()));
    };

    let minor_version = match version {
        "HTTP/1.1" => 1,
        "HTTP/1.0" => 0,
        other => return Err(HttpParseError::UnsupportedVersion(other.to_string())),
    };

    Ok((Method::parse(method), target, minor_version))
}

fn parse_header(line: &str) -> ParseResult<(String, String)> {
    match line.split_once(':') {
        Some((name, value)) if !name.is_empty() && !name.ends_with(' ') => {
            Ok((name.to_ascii_lowercase(), value.trim().to_string()))
        }
        _ => Err(HttpParseError::MalformedHeader(line.to_string())),
    }
}

fn body_length(headers: &[(String, String)]) -> ParseResult<usize> {
    if let Some((_, encoding)) = headers.iter().find(|(k, _)| k == "transfer-encoding") {
        return Err(HttpParseError::UnsupportedTransferEncoding(encoding.clone()));
    }

    let Some((_, value)) = headers.iter().find(|(k, _)| k == "content-length") else {
        return Ok(0);
    };

    let size: usize = value
        .parse()
        .map_err(|_| HttpParseError::InvalidContentLength(value.clone()))?;
    if size > MAX_BODY_SIZE {
        return Err(HttpParseError::BodyTooLarge {
            size,
            max: MAX_BODY_SIZE,
        });
    }
    Ok(size)
}

/// Splits a request target into its path and decoded query parameters.
fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect();

    (percent_decode(path), params)
}

/// Decodes `%XX` escapes and `+` as space. Invalid escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let buf = b"GET /get?key=name HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, consumed) = parse_request(buf).unwrap().unwrap();

        assert_eq!(consumed, buf.len());
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/get");
        assert_eq!(req.query_param("key"), Some("name"));
        assert_eq!(req.header("host"), Some("localhost"));
        assert_eq!(req.minor_version, 1);
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_parse_post_with_body() {
        let body = br#"{"key":"k","value":"v"}"#;
        let mut buf = format!(
            "POST /set HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        buf.extend_from_slice(body);

        let (req, consumed) = parse_request(&buf).unwrap().unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(req.method, Method::Post);
        assert_eq!(&req.body[..], &body[..]);
    }

    #[test]
    fn test_incomplete_head_and_body() {
        assert_eq!(parse_request(b"").unwrap(), None);
        assert_eq!(parse_request(b"GET /get HTTP/1.1\r\nHost: x\r\n").unwrap(), None);
        assert_eq!(
            parse_request(b"POST /set HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap(),
            None
        );
    }

    #[test]
    fn test_pipelined_requests() {
        let buf = b"GET /get?key=a HTTP/1.1\r\n\r\nGET /get?key=b HTTP/1.1\r\n\r\n";
        let (first, consumed) = parse_request(buf).unwrap().unwrap();
        assert_eq!(first.query_param("key"), Some("a"));

        let (second, rest) = parse_request(&buf[consumed..]).unwrap().unwrap();
        assert_eq!(second.query_param("key"), Some("b"));
        assert_eq!(consumed + rest, buf.len());
    }

    #[test]
    fn test_malformed_request_line() {
        assert!(matches!(
            parse_request(b"GARBAGE\r\n\r\n"),
            Err(HttpParseError::MalformedRequestLine(_))
        ));
        assert!(matches!(
            parse_request(b"GET / HTTP/2.0\r\n\r\n"),
            Err(HttpParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            parse_request(b"GET / HTTP/1.1\r\nno-colon-here\r\n\r\n"),
            Err(HttpParseError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_content_length_errors() {
        assert!(matches!(
            parse_request(b"POST /set HTTP/1.1\r\nContent-Length: -1\r\n\r\n"),
            Err(HttpParseError::InvalidContentLength(_))
        ));

        let huge = format!(
            "POST /set HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            MAX_BODY_SIZE + 1
        );
        assert!(matches!(
            parse_request(huge.as_bytes()),
            Err(HttpParseError::BodyTooLarge { .. })
        ));

        assert!(matches!(
            parse_request(b"POST /set HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n"),
            Err(HttpParseError::UnsupportedTransferEncoding(_))
        ));
    }

    #[test]
    fn test_head_too_large() {
        let mut buf = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
        buf.extend(std::iter::repeat(b'a').take(MAX_HEAD_SIZE));
        assert!(matches!(
            parse_request(&buf),
            Err(HttpParseError::HeadTooLarge { .. })
        ));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("user%3A42"), "user:42");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_query_decoding() {
        let buf = b"GET /get?key=user%3A42&flag HTTP/1.1\r\n\r\n";
        let (req, _) = parse_request(buf).unwrap().unwrap();
        assert_eq!(req.query_param("key"), Some("user:42"));
        assert_eq!(req.query_param("flag"), Some(""));
    }
}
