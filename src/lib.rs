//! Granblue Proxy library.
//!
//! Two services share this crate:
//! - the host-routing controller ([`http::ControllerServer`]), an HTTP proxy
//!   that sends game traffic to the origin or through the cache service and
//!   rejects every other host
//! - the tunnel proxy ([`net::TunnelProxy`]), a raw TCP proxy that handles
//!   `CONNECT` and pipes bytes to a single backend

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::ControllerServer;
pub use lifecycle::Shutdown;
pub use net::TunnelProxy;
