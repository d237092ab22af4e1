//! Per-Client HTTP Sessions
//!
//! Every accepted socket becomes one [`ConnectionHandler`] running on its own
//! task. The handler owns the socket and a growable request buffer, and
//! answers requests strictly in arrival order.
//!
//! ```text
//!   socket bytes ──> BytesMut ──> parse_request ──> ApiHandler::execute
//!                       ▲               │                    │
//!                       │          Ok(None): read more       ▼
//!                       └───────────────┘          HttpResponse::serialize
//!                                                            │
//!                        keep-alive? loop : hang up  <───────┘
//! ```
//!
//! A request that cannot be parsed is answered with a 4xx/5xx status, then
//! the connection is closed.

use crate::api::ApiHandler;
use crate::http::{parse_request, HttpParseError, HttpRequest, HttpResponse, Method, StatusCode};
use bytes::BytesMut;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

/// Upper bound on buffered, unparsed bytes per connection (2 MB)
const MAX_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Starting capacity of the request buffer; most requests fit in one page
const READ_CHUNK: usize = 4096;

/// Server-wide counters shared by every connection task.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub requests_processed: AtomicU64,
    /// Requests served on a connection that had already served one
    pub keep_alive_reuses: AtomicU64,
    pub parse_errors: AtomicU64,
    pub bytes_read: AtomicU64,
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// One client's HTTP session.
pub struct ConnectionHandler {
    stream: BufWriter<TcpStream>,
    addr: SocketAddr,
    /// Bytes received but not yet consumed by the parser
    buffer: BytesMut,
    api: ApiHandler,
    stats: Arc<ConnectionStats>,
    /// Requests answered on this connection so far
    served: u64,
}

impl ConnectionHandler {
    /// Wraps an accepted socket. Counts the connection as active until the
    /// handler is dropped.
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        api: ApiHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        ConnectionStats::add(&stats.connections_accepted, 1);
        ConnectionStats::add(&stats.active_connections, 1);

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            api,
            stats,
            served: 0,
        }
    }

    /// Serves requests until the peer hangs up, asks to close, or sends
    /// something unparseable.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let outcome = self.serve().await;
        match &outcome {
            Ok(()) => info!(client = %self.addr, served = self.served, "Connection closed"),
            Err(e) if e.is_hangup() => {
                debug!(client = %self.addr, served = self.served, "Client hung up")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection failed"),
        }
        outcome
    }

    async fn serve(&mut self) -> Result<(), ConnectionError> {
        loop {
            let Some(request) = self.next_request().await? else {
                self.fill_buffer().await?;
                continue;
            };

            let keep_alive = request.keep_alive();
            let response = self.respond_to(&request, keep_alive);
            self.write_response(&response, request.method != Method::Head)
                .await?;

            if !keep_alive {
                return Ok(());
            }
        }
    }

    /// Runs `request` through the API and applies connection headers.
    fn respond_to(&mut self, request: &HttpRequest, keep_alive: bool) -> HttpResponse {
        let response = self.api.execute(request);

        ConnectionStats::add(&self.stats.requests_processed, 1);
        if self.served > 0 {
            ConnectionStats::add(&self.stats.keep_alive_reuses, 1);
        }
        self.served += 1;

        debug!(
            client = %self.addr,
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "Request served"
        );

        match (keep_alive, request.minor_version) {
            (false, _) => response.with_close(),
            // HTTP/1.0 clients close by default unless told otherwise
            (true, 0) => response.with_header("Connection", "keep-alive"),
            (true, _) => response,
        }
    }

    /// Takes one complete request off the front of the buffer, if present.
    ///
    /// A parse failure is reported to the client before the error is
    /// returned.
    async fn next_request(&mut self) -> Result<Option<HttpRequest>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match parse_request(&self.buffer) {
            Ok(Some((request, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed,
                    pipelined = self.buffer.len(),
                    "Request parsed"
                );
                Ok(Some(request))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                ConnectionStats::add(&self.stats.parse_errors, 1);
                warn!(client = %self.addr, error = %e, "Rejecting unparseable request");
                let response =
                    HttpResponse::error(status_for(&e), &e.to_string()).with_close();
                self.write_response(&response, true).await?;
                Err(ConnectionError::BadRequest(e))
            }
        }
    }

    /// Appends at least one byte from the socket to the buffer.
    async fn fill_buffer(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(client = %self.addr, buffered = self.buffer.len(), "Request buffer full");
            return Err(ConnectionError::BufferFull);
        }
        self.buffer.reserve(READ_CHUNK);

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(if self.buffer.is_empty() {
                ConnectionError::Closed
            } else {
                ConnectionError::TruncatedRequest(self.buffer.len())
            });
        }

        ConnectionStats::add(&self.stats.bytes_read, n as u64);
        Ok(())
    }

    async fn write_response(
        &mut self,
        response: &HttpResponse,
        include_body: bool,
    ) -> Result<(), ConnectionError> {
        let wire = response.serialize(include_body);
        self.stream.write_all(&wire).await?;
        self.stream.flush().await?;
        ConnectionStats::add(&self.stats.bytes_written, wire.len() as u64);
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.stats.active_connections.fetch_sub(1, Ordering::Relaxed);
    }
}

fn status_for(e: &HttpParseError) -> StatusCode {
    match e {
        HttpParseError::BodyTooLarge { .. } => StatusCode::PayloadTooLarge,
        HttpParseError::HeadTooLarge { .. } => StatusCode::RequestHeaderFieldsTooLarge,
        HttpParseError::UnsupportedTransferEncoding(_) => StatusCode::NotImplemented,
        _ => StatusCode::BadRequest,
    }
}

/// Why a connection ended early.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad request: {0}")]
    BadRequest(#[from] HttpParseError),

    /// Peer closed between requests
    #[error("peer closed the connection")]
    Closed,

    /// Peer closed partway through a request
    #[error("peer closed with {0} bytes of an unfinished request")]
    TruncatedRequest(usize),

    #[error("request buffer limit exceeded")]
    BufferFull,
}

impl ConnectionError {
    /// True for the ordinary ways a client goes away.
    pub fn is_hangup(&self) -> bool {
        match self {
            ConnectionError::Closed => true,
            ConnectionError::Io(e) => matches!(
                e.kind(),
                ErrorKind::ConnectionReset | ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

/// Runs one connection to completion. Errors are logged by the handler.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    api: ApiHandler,
    stats: Arc<ConnectionStats>,
) {
    let _ = ConnectionHandler::new(stream, addr, api, stats).run().await;
}
