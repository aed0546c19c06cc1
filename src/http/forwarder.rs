//! Host-routing forwarder.
//!
//! # Responsibilities
//! - Classify each request by hostname against the cache health snapshot
//! - Pick the transport (direct, cache, or direct to the static web server)
//! - Forward the request and relay the upstream response verbatim
//! - Turn failures into 403 / 502 / 503
//!
//! # Design Decisions
//! - One health snapshot per request, read before any I/O
//! - Request and response bodies are fully buffered
//! - Upstream statuses, including errors, are never rewritten

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::health::SharedHealthState;
use crate::http::request;
use crate::http::response::error_response;
use crate::http::transport::Transports;
use crate::observability::metrics;
use crate::routing::{classify, RoutingDecision};

/// Per-request forwarding failure.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("host not allowed: '{0}'")]
    Forbidden(String),

    #[error("backend unreachable: {0}")]
    BackendUnreachable(#[source] reqwest::Error),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl ForwardError {
    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::Forbidden(_) => StatusCode::FORBIDDEN,
            ForwardError::BackendUnreachable(_) => StatusCode::BAD_GATEWAY,
            ForwardError::Internal(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let reason = match self {
            ForwardError::Forbidden(_) => "Host not allowed",
            ForwardError::BackendUnreachable(_) => "Bad gateway",
            ForwardError::Internal(_) => "Internal server error",
        };
        error_response(self.status(), reason)
    }
}

#[derive(Debug, Clone)]
struct StaticWeb {
    host: String,
    address: String,
}

/// Routes requests by hostname and forwards them upstream.
#[derive(Debug, Clone)]
pub struct Forwarder {
    web: Option<StaticWeb>,
    health: SharedHealthState,
    transports: Transports,
    max_body_size: usize,
}

impl Forwarder {
    pub fn new(
        config: &ControllerConfig,
        transports: Transports,
        health: SharedHealthState,
    ) -> Self {
        let web = match (&config.web_address, config.resolved_web_host()) {
            (Some(address), Some(host)) => Some(StaticWeb {
                host,
                address: address.clone(),
            }),
            _ => {
                tracing::info!("Web address not set. Static web capability disabled.");
                None
            }
        };

        Self {
            web,
            health,
            transports,
            max_body_size: config.max_body_size,
        }
    }

    /// Hostname served from the static web server, if enabled.
    pub fn web_host(&self) -> Option<&str> {
        self.web.as_ref().map(|web| web.host.as_str())
    }

    /// True when a cache transport exists and the last heartbeat succeeded.
    pub fn cache_available(&self) -> bool {
        self.transports.cache.is_some() && self.health.is_cache_available()
    }

    /// Routing decision for `hostname` right now.
    pub fn route(&self, hostname: &str) -> RoutingDecision {
        classify(hostname, self.web_host(), self.cache_available())
    }

    /// Forward one request. Never fails; errors become status responses.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let start = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();
        let authority = request::authority(&req);
        let hostname = request::hostname(authority.as_ref()).to_string();
        let decision = self.route(&hostname);

        tracing::info!(
            method = %method,
            uri = %uri,
            host = %hostname,
            route = %decision,
            "Routing request"
        );

        let result = match authority {
            Some(authority) => self.forward(decision, authority.as_str(), req).await,
            None => Err(ForwardError::Forbidden(hostname.clone())),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ForwardError::Forbidden(_) => {}
                    ForwardError::BackendUnreachable(_) => tracing::warn!(
                        host = %hostname,
                        route = %decision,
                        error = %e,
                        "Upstream unreachable"
                    ),
                    ForwardError::Internal(_) => tracing::error!(
                        host = %hostname,
                        route = %decision,
                        error = %e,
                        "Forwarding failed"
                    ),
                }
                e.into_response()
            }
        };

        metrics::record_request(decision.as_str(), response.status().as_u16(), start);
        response
    }

    async fn forward(
        &self,
        decision: RoutingDecision,
        authority: &str,
        req: Request<Body>,
    ) -> Result<Response, ForwardError> {
        let (client, upstream_authority) = match (decision, &self.web, &self.transports.cache) {
            (RoutingDecision::Forbidden, _, _) => {
                return Err(ForwardError::Forbidden(authority.to_string()))
            }
            (RoutingDecision::StaticWeb, Some(web), _) => {
                (&self.transports.direct, web.address.as_str())
            }
            (RoutingDecision::CacheBackend, _, Some(cache)) => (&cache.client, authority),
            (RoutingDecision::DirectOrigin, _, _) => (&self.transports.direct, authority),
            (decision, _, _) => {
                return Err(ForwardError::Internal(format!("no transport for route {}", decision)))
            }
        };

        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| ForwardError::Internal(format!("failed reading request body: {}", e)))?;
        let url = request::outbound_url(&parts.uri, upstream_authority)
            .map_err(ForwardError::Internal)?;

        let upstream = client
            .request(parts.method, url)
            .headers(request::outbound_headers(parts.headers))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ForwardError::Internal(e.to_string())
                } else {
                    ForwardError::BackendUnreachable(e)
                }
            })?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let body = upstream
            .bytes()
            .await
            .map_err(|e| ForwardError::Internal(format!("failed reading upstream body: {}", e)))?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{default_client, CacheTransport};

    fn config() -> ControllerConfig {
        ControllerConfig {
            bind_address: "127.0.0.1:8088".to_string(),
            web_address: Some("127.0.0.1:8000".to_string()),
            web_host: Some("gbf.local".to_string()),
            ..Default::default()
        }
    }

    fn transports(with_cache: bool) -> Transports {
        Transports {
            direct: default_client().unwrap(),
            cache: with_cache.then(|| CacheTransport::new("127.0.0.1:8001".to_string()).unwrap()),
        }
    }

    #[test]
    fn cache_route_follows_health_flag() {
        let health = SharedHealthState::new(true);
        let forwarder = Forwarder::new(&config(), transports(true), health.clone());
        assert_eq!(forwarder.route("game-a.granbluefantasy.jp"), RoutingDecision::CacheBackend);

        health.set_cache_available(false);
        assert_eq!(forwarder.route("game-a.granbluefantasy.jp"), RoutingDecision::DirectOrigin);
    }

    #[test]
    fn no_cache_transport_never_routes_to_cache() {
        let forwarder = Forwarder::new(&config(), transports(false), SharedHealthState::new(true));
        assert_eq!(forwarder.route("cdn-connect.mobage.jp"), RoutingDecision::DirectOrigin);
    }

    #[test]
    fn static_web_disabled_without_address() {
        let mut config = config();
        config.web_address = None;
        let forwarder = Forwarder::new(&config, transports(false), SharedHealthState::default());
        assert_eq!(forwarder.web_host(), None);
        assert_eq!(forwarder.route("gbf.local"), RoutingDecision::Forbidden);
    }

    #[tokio::test]
    async fn forbidden_host_gets_403() {
        let forwarder = Forwarder::new(&config(), transports(false), SharedHealthState::default());
        let req = Request::builder()
            .uri("http://evil.example.com/")
            .body(Body::empty())
            .unwrap();
        let response = forwarder.handle(req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Host not allowed");
    }

    #[tokio::test]
    async fn request_without_host_is_forbidden() {
        let forwarder = Forwarder::new(&config(), transports(false), SharedHealthState::default());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(forwarder.handle(req).await.status(), StatusCode::FORBIDDEN);
    }
}
