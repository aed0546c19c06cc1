//! HTTP server setup for the host-routing controller.
//!
//! # Responsibilities
//! - Create the Axum Router with the forwarding handler
//! - Wire up middleware (tracing, panic → 503)
//! - Start the cache heartbeat next to the server
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::ControllerConfig;
use crate::health::{HeartbeatMonitor, SharedHealthState};
use crate::http::forwarder::Forwarder;
use crate::http::response::panic_response;
use crate::http::transport::Transports;
use crate::lifecycle::ShutdownSignal;

/// HTTP server for the host-routing controller.
pub struct ControllerServer {
    forwarder: Arc<Forwarder>,
    heartbeat: HeartbeatMonitor,
    health: SharedHealthState,
}

impl ControllerServer {
    /// Create a server. Cache availability starts optimistic when a cache
    /// transport exists; the first heartbeat runs as soon as the server starts.
    pub fn new(config: &ControllerConfig, transports: Transports) -> Self {
        let health = SharedHealthState::new(transports.cache.is_some());
        let heartbeat = HeartbeatMonitor::new(transports.cache.clone(), health.clone());
        let forwarder = Arc::new(Forwarder::new(config, transports, health.clone()));

        Self {
            forwarder,
            heartbeat,
            health,
        }
    }

    /// Replace the heartbeat monitor, e.g. to change its interval.
    pub fn with_heartbeat(mut self, f: impl FnOnce(HeartbeatMonitor) -> HeartbeatMonitor) -> Self {
        self.heartbeat = f(self.heartbeat);
        self
    }

    /// Shared cache health flag.
    pub fn health(&self) -> SharedHealthState {
        self.health.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(forwarder: Arc<Forwarder>) -> Router {
        with_middleware(Router::new().fallback(forward_handler).with_state(forwarder))
    }

    /// Run the server on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            static_web = self.forwarder.web_host().unwrap_or("-"),
            "Controller starting"
        );

        let heartbeat = tokio::spawn(self.heartbeat.run(shutdown.clone()));

        let app = Self::router(self.forwarder);
        let mut server_shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.recv().await })
            .await?;

        let _ = heartbeat.await;
        tracing::info!("Controller stopped");
        Ok(())
    }
}

/// Tracing plus the per-request failure boundary: a panicking handler
/// becomes a 503 instead of taking the connection down.
fn with_middleware(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

async fn forward_handler(
    State(forwarder): State<Arc<Forwarder>>,
    request: Request<Body>,
) -> Response {
    forwarder.handle(request).await
}
