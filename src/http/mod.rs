//! HTTP protocol handling subsystem (host-routing controller).
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, heartbeat task)
//!     → forwarder.rs (classify host, pick transport)
//!     → request.rs (authority, outbound url and headers)
//!     → transport.rs (direct or cache client)
//!     → Upstream response relayed verbatim
//!     → response.rs (proxy-generated errors only)
//! ```

pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;
pub mod transport;

pub use forwarder::{ForwardError, Forwarder};
pub use server::ControllerServer;
pub use transport::{CacheTransport, Transports};
