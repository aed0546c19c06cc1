//! Configuration validation.
//!
//! Serde handles syntax; this checks the values make sense together.
//! Every problem found is returned, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' must be in host:port form")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("{field}: '{value}' must be in host:port form")]
    InvalidUpstreamAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_bind(&mut errors, "controller.bind_address", &config.controller.bind_address);
    check_bind(&mut errors, "tunnel.bind_address", &config.tunnel.bind_address);

    if let Some(addr) = &config.controller.cache_address {
        check_upstream(&mut errors, "controller.cache_address", addr);
    }
    if let Some(addr) = &config.controller.web_address {
        check_upstream(&mut errors, "controller.web_address", addr);
    }
    check_upstream(&mut errors, "tunnel.backend_address", &config.tunnel.backend_address);

    if config.controller.max_body_size == 0 {
        errors.push(ValidationError::ZeroLimit { field: "controller.max_body_size" });
    }
    if config.tunnel.max_connections == 0 {
        errors.push(ValidationError::ZeroLimit { field: "tunnel.max_connections" });
    }
    if config.tunnel.max_header_bytes == 0 {
        errors.push(ValidationError::ZeroLimit { field: "tunnel.max_header_bytes" });
    }

    if config.observability.metrics_enabled {
        let addr = &config.observability.metrics_address;
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidSocketAddress {
                field: "observability.metrics_address",
                value: addr.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !is_host_port(value) {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_upstream(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !is_host_port(value) {
        errors.push(ValidationError::InvalidUpstreamAddress {
            field,
            value: value.to_string(),
        });
    }
}

/// `host:port` with a non-empty host. Hostnames are resolved at bind or dial time.
fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ProxyConfig::default();
        config.controller.bind_address = "nope".to_string();
        config.controller.cache_address = Some("cache-without-port".to_string());
        config.tunnel.max_header_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroLimit { field: "tunnel.max_header_bytes" }));
    }

    #[test]
    fn hostname_upstreams_are_accepted() {
        let mut config = ProxyConfig::default();
        config.controller.web_address = Some("static.internal:8000".to_string());
        config.tunnel.backend_address = "controller:8088".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn hostname_bind_addresses_are_accepted() {
        let mut config = ProxyConfig::default();
        config.controller.bind_address = "localhost:8088".to_string();
        config.controller.web_address = Some("localhost:8000".to_string());
        config.tunnel.bind_address = "localhost:8089".to_string();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.controller.resolved_web_host().as_deref(), Some("localhost"));
    }

    #[test]
    fn bind_address_without_port_is_rejected() {
        let mut config = ProxyConfig::default();
        config.tunnel.bind_address = "localhost".to_string();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidBindAddress {
                field: "tunnel.bind_address",
                value: "localhost".to_string(),
            }])
        );
    }

    #[test]
    fn metrics_address_must_be_a_socket_address() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "localhost:9090".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidSocketAddress { field: "observability.metrics_address", .. }]
        ));
    }
}
