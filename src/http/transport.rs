//! Upstream HTTP transports.
//!
//! The forwarder picks one of two clients per request: the direct client,
//! or the cache client which sends everything through the cache service
//! acting as a forward proxy.

use reqwest::{redirect, Client, Proxy};

use crate::config::ControllerConfig;

/// Client routed through the cache service.
#[derive(Debug, Clone)]
pub struct CacheTransport {
    /// Cache service `host:port`.
    pub address: String,
    /// Client using `address` as its HTTP proxy.
    pub client: Client,
}

impl CacheTransport {
    /// Build a client that proxies every request through `address`.
    pub fn new(address: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .proxy(Proxy::all(format!("http://{}", address))?)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self { address, client })
    }
}

/// The set of clients available to the forwarder.
#[derive(Debug, Clone)]
pub struct Transports {
    /// Default transport for direct origin and static web traffic.
    pub direct: Client,
    /// Cache transport; `None` disables cache routing.
    pub cache: Option<CacheTransport>,
}

impl Transports {
    /// Build the default transports for a controller configuration.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, reqwest::Error> {
        let direct = default_client()?;
        let cache = match &config.cache_address {
            Some(address) => Some(CacheTransport::new(address.clone())?),
            None => {
                tracing::info!("Cache address not set. Caching capability disabled.");
                None
            }
        };
        Ok(Self { direct, cache })
    }
}

/// Direct client. Environment proxy settings are honoured; redirects are passed
/// back to the caller untouched.
pub fn default_client() -> Result<Client, reqwest::Error> {
    Client::builder().redirect(redirect::Policy::none()).build()
}
