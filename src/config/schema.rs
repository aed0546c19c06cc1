//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for both proxy services.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Host-routing controller (HTTP level).
    pub controller: ControllerConfig,

    /// Raw tunnel proxy (TCP level).
    pub tunnel: TunnelConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Host-routing controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Bind address (e.g., "0.0.0.0:8088").
    pub bind_address: String,

    /// Cache service address. `None` disables cache routing for good.
    pub cache_address: Option<String>,

    /// Static file server address. `None` disables static web routing.
    pub web_address: Option<String>,

    /// Hostname that is served from the static file server.
    /// Defaults to the host part of `bind_address`.
    pub web_host: Option<String>,

    /// Maximum inbound request body buffered for forwarding, in bytes.
    pub max_body_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8088".to_string(),
            cache_address: None,
            web_address: None,
            web_host: None,
            max_body_size: 16 * 1024 * 1024,
        }
    }
}

impl ControllerConfig {
    /// Hostname matched for static web routing, if static web is enabled.
    pub fn resolved_web_host(&self) -> Option<String> {
        self.web_address.as_ref()?;
        match &self.web_host {
            Some(host) if !host.is_empty() => Some(host.clone()),
            _ => Some(addr_to_host(&self.bind_address).to_string()),
        }
    }
}

/// Tunnel proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Bind address (e.g., "0.0.0.0:8089").
    pub bind_address: String,

    /// Address every tunnel is dialed to (usually the controller).
    pub backend_address: String,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,

    /// Upper bound on the header block read before giving up with 400.
    pub max_header_bytes: usize,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8089".to_string(),
            backend_address: "127.0.0.1:8088".to_string(),
            max_connections: 10_000,
            max_header_bytes: 64 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Host part of a `host:port` address. Bracketed IPv6 hosts lose the brackets.
pub fn addr_to_host(addr: &str) -> &str {
    let host = match addr.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => addr,
    };
    host.trim_start_matches('[').trim_end_matches(']')
}
