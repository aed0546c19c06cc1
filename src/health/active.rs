//! Active health checking of the cache service.
//!
//! # Responsibilities
//! - Periodically probe the cache service
//! - Update the shared cache health flag based on results

use std::time::Duration;
use tokio::time;

use crate::health::state::SharedHealthState;
use crate::http::transport::CacheTransport;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Interval between two probes.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Header marking a request as a cache service API call rather than proxied traffic.
pub const CACHE_API_HEADER: &str = "X-GBF-Cache-API";

const PING_PATH: &str = "/ping";
const PING_OK: &str = "OK";

/// Background heartbeat against the cache service.
pub struct HeartbeatMonitor {
    cache: Option<CacheTransport>,
    state: SharedHealthState,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(cache: Option<CacheTransport>, state: SharedHealthState) -> Self {
        Self {
            cache,
            state,
            interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Override the probe interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Probe once immediately, then once per interval, until shutdown.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        match &self.cache {
            Some(cache) => tracing::info!(
                cache = %cache.address,
                interval_secs = self.interval.as_secs(),
                "Cache heartbeat starting"
            ),
            None => tracing::info!("Cache address not set, heartbeat will report unavailable"),
        }

        while shutdown.is_running() {
            // A probe against a cache that accepts but never answers must not
            // hold up shutdown.
            tokio::select! {
                _ = self.tick() => {}
                _ = shutdown.recv() => break,
            }

            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Cache heartbeat received shutdown signal, exiting loop");
    }

    /// Run one probe and store the outcome. Returns the new flag value.
    pub async fn tick(&self) -> bool {
        let available = match &self.cache {
            Some(cache) => probe(cache).await,
            None => false,
        };

        let previous = self.state.set_cache_available(available);
        if previous != available {
            tracing::info!(available, "Cache availability changed");
        }
        metrics::record_cache_health(available);
        available
    }
}

async fn probe(cache: &CacheTransport) -> bool {
    let url = format!("http://{}{}", cache.address, PING_PATH);
    let response = match cache.client.get(&url).header(CACHE_API_HEADER, "1").send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(cache = %cache.address, error = %e, "Cache heartbeat: request failed");
            return false;
        }
    };

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                cache = %cache.address,
                error = %e,
                "Cache heartbeat: failed reading response"
            );
            return false;
        }
    };

    let text = body.trim();
    if text != PING_OK {
        tracing::warn!(cache = %cache.address, body = %text, "Cache heartbeat: expected 'OK'");
        return false;
    }

    tracing::info!(cache = %cache.address, "Cache heartbeat: OK");
    true
}
