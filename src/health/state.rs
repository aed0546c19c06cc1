//! Cache health state.
//!
//! One flag, written by the heartbeat monitor and read by the forwarder.
//! Latest probe wins; no history and no hysteresis.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Thread-safe "is the cache reachable" flag. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct SharedHealthState {
    cache_available: Arc<AtomicBool>,
}

impl SharedHealthState {
    /// Create a state with the given initial value.
    pub fn new(cache_available: bool) -> Self {
        Self {
            cache_available: Arc::new(AtomicBool::new(cache_available)),
        }
    }

    /// Snapshot of the flag.
    pub fn is_cache_available(&self) -> bool {
        self.cache_available.load(Ordering::SeqCst)
    }

    /// Store a new value, returning the previous one.
    pub fn set_cache_available(&self, available: bool) -> bool {
        self.cache_available.swap(available, Ordering::SeqCst)
    }
}

impl Default for SharedHealthState {
    fn default() -> Self {
        Self::new(false)
    }
}
