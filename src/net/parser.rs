//! Raw request head parsing.
//!
//! # Responsibilities
//! - Read from a connection until the `\r\n\r\n` terminator
//! - Split the head into request line and header map
//! - Keep every byte read so it can be replayed to the backend
//!
//! # Design Decisions
//! - No body framing: bytes after the terminator that arrived in the same
//!   reads stay in the payload and are replayed, nothing more is read
//! - Duplicate header names keep the last value. Repeated headers such as
//!   `Cookie` are not merged; only the method is used for routing today
//! - Benign closure ends the read loop like EOF; what was read so far is
//!   then parsed (and usually rejected for lacking the terminator)

use std::collections::HashMap;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::lifecycle::ShutdownSignal;
use crate::net::is_benign;

/// Read chunk size.
pub const READ_CHUNK_SIZE: usize = 65535;

const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Why a request head could not be parsed.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A request head read off a raw connection. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub method: String,
    pub target: String,
    pub version: String,
    /// Header name to value, last occurrence wins.
    pub headers: HashMap<String, String>,
    /// Header block text without the terminator.
    pub raw_header_block: String,
    /// Every byte read from the connection, terminator and early body bytes included.
    pub payload: Vec<u8>,
}

impl ParsedRequest {
    pub fn is_connect(&self) -> bool {
        self.method == "CONNECT"
    }

    /// Request line as received.
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }
}

/// Reads one request head per connection.
#[derive(Debug, Clone)]
pub struct RawRequestParser {
    max_header_bytes: usize,
}

impl RawRequestParser {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { max_header_bytes }
    }

    /// Read and parse a request head from `conn`.
    pub async fn parse<R>(
        &self,
        conn: &mut R,
        running: &ShutdownSignal,
    ) -> Result<ParsedRequest, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let payload = self.read_head(conn, running).await?;
        parse_head(payload)
    }

    async fn read_head<R>(
        &self,
        conn: &mut R,
        running: &ShutdownSignal,
    ) -> Result<Vec<u8>, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        let mut payload = Vec::new();
        let mut buffer = vec![0u8; READ_CHUNK_SIZE];

        while running.is_running() {
            let read = match conn.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if is_benign(&e) => break,
                Err(e) => return Err(ParseError::Io(e)),
            };

            // Only the tail can complete a terminator split across reads.
            let scan_from = payload.len().saturating_sub(TERMINATOR.len() - 1);
            payload.extend_from_slice(&buffer[..read]);

            if find(&payload[scan_from..], TERMINATOR).is_some() {
                break;
            }
            if payload.len() > self.max_header_bytes {
                return Err(ParseError::TooLarge(self.max_header_bytes));
            }
        }

        Ok(payload)
    }
}

/// Parse an accumulated payload into a request.
///
/// A head made of the request line alone is accepted; header lines are optional.
pub fn parse_head(payload: Vec<u8>) -> Result<ParsedRequest, ParseError> {
    let end = find(&payload, TERMINATOR)
        .ok_or(ParseError::Malformed("missing header terminator"))?;

    let head = String::from_utf8_lossy(&payload[..end]);
    let raw_header_block = head.trim().to_string();
    if raw_header_block.is_empty() {
        return Err(ParseError::Malformed("missing request line"));
    }

    let mut lines = raw_header_block.split("\r\n");
    let request_line = lines.next().ok_or(ParseError::Malformed("missing request line"))?;

    let mut parts = request_line.split(' ');
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) if !m.is_empty() && !t.is_empty() && !v.is_empty() => {
            (m.to_string(), t.to_string(), v.to_string())
        }
        _ => return Err(ParseError::Malformed("invalid request line")),
    };

    let mut headers = HashMap::new();
    for line in lines {
        match line.find(": ") {
            Some(idx) if idx > 0 => {
                headers.insert(line[..idx].to_string(), line[idx + 2..].to_string());
            }
            _ => return Err(ParseError::Malformed("header line without ': '")),
        }
    }

    Ok(ParsedRequest {
        method,
        target,
        version,
        headers,
        raw_header_block,
        payload,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
