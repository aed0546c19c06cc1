//! Network layer subsystem (raw tunnel proxy).
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (ids, active count)
//!     → parser.rs (read request head up to \r\n\r\n)
//!     → tunnel.rs (dial backend, CONNECT reply or replay)
//!     → pipe.rs (copy both ways until one side closes)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Only the request head is parsed; everything after is opaque bytes
//! - Peer closure is normal termination, not an error

pub mod connection;
pub mod listener;
pub mod parser;
pub mod pipe;
pub mod tunnel;

pub use listener::Listener;
pub use parser::{ParseError, ParsedRequest, RawRequestParser};
pub use pipe::{pipe, PipeStats, Tunnel};
pub use tunnel::TunnelProxy;

use std::io::{Error, ErrorKind};

/// I/O outcomes that mean the peer went away rather than something broke.
pub fn is_benign(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
