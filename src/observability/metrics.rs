//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gbf_requests_total` (counter): controller requests by route, status
//! - `gbf_request_duration_seconds` (histogram): controller latency by route
//! - `gbf_tunnels_total` (counter): tunnel connections by outcome
//! - `gbf_active_tunnels` (gauge): open tunnel client connections
//! - `gbf_cache_available` (gauge): 1=cache healthy, 0=unhealthy
//!
//! Without an installed exporter every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    ::metrics::counter!("gbf_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("gbf_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tunnel(outcome: &'static str) {
    ::metrics::counter!("gbf_tunnels_total", "outcome" => outcome).increment(1);
}

pub fn record_active_tunnels(active: u64) {
    ::metrics::gauge!("gbf_active_tunnels").set(active as f64);
}

pub fn record_cache_health(available: bool) {
    ::metrics::gauge!("gbf_cache_available").set(if available { 1.0 } else { 0.0 });
}
