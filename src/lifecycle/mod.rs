//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → main triggers Shutdown
//!
//! Shutdown (shutdown.rs):
//!     trigger() → running flag false
//!     → accept loops stop, heartbeat exits,
//!       parser/pipe loops drain to their next poll point
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
