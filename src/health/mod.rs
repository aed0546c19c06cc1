//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Heartbeat (active.rs):
//!     Fixed interval timer
//!     → GET /ping on the cache service
//!     → body == "OK" ? healthy : unhealthy
//!     → Update state.rs
//!
//! Forwarder:
//!     Reads a snapshot of state.rs once per request
//! ```
//!
//! # Design Decisions
//! - Only the cache service is health checked
//! - Latest probe result wins, so identical probe sequences
//!   always produce identical flag sequences
//! - Probe failures are never fatal

pub mod active;
pub mod state;

pub use active::{HeartbeatMonitor, CACHE_API_HEADER, DEFAULT_HEARTBEAT_INTERVAL};
pub use state::SharedHealthState;
