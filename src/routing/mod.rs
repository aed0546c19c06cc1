//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (hostname)
//!     + cache health snapshot
//!     → classifier.rs (ordered prefix/suffix rules)
//!     → Return: RoutingDecision
//! ```
//!
//! # Design Decisions
//! - Pure function, no state of its own
//! - Deterministic: same input always yields the same decision
//! - First match wins

pub mod classifier;

pub use classifier::{classify, RoutingDecision};
