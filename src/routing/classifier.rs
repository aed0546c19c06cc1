//! Host classification.
//!
//! # Responsibilities
//! - Map a request hostname to a [`RoutingDecision`]
//! - Gate cache routing on the current cache health snapshot
//!
//! # Design Decisions
//! - Plain prefix/suffix string checks, not DNS-label aware
//!   (`xgranbluefantasy.jp` does not match `.granbluefantasy.jp`,
//!   but `notbaidu.com` does match `baidu.com`)
//! - Only the static web rule compares the full hostname
//! - First match wins, in the order of the rules below

use std::fmt;

const GAME_SUFFIX: &str = ".granbluefantasy.jp";
const GAME_CACHE_PREFIX: &str = "game-a";
const PLATFORM_SUFFIX: &str = ".mobage.jp";
const PLATFORM_CACHE_PREFIX: &str = "cdn-connect";
const ORIGIN_IP_SUFFIX: &str = "203.104.248.14";
const BAIDU_SUFFIX: &str = "baidu.com";

/// Where a request should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingDecision {
    /// Rewrite to the static file server.
    StaticWeb,
    /// Send through the cache service.
    CacheBackend,
    /// Send straight to the origin.
    DirectOrigin,
    /// Reject with 403.
    Forbidden,
}

impl RoutingDecision {
    /// Short label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingDecision::StaticWeb => "static_web",
            RoutingDecision::CacheBackend => "cache",
            RoutingDecision::DirectOrigin => "direct",
            RoutingDecision::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a hostname.
///
/// `web_host` is `Some` only when static web serving is configured.
/// `cache_available` is a snapshot of the cache health flag.
pub fn classify(hostname: &str, web_host: Option<&str>, cache_available: bool) -> RoutingDecision {
    if web_host.is_some_and(|web| web == hostname) {
        return RoutingDecision::StaticWeb;
    }

    if hostname.ends_with(GAME_SUFFIX) {
        // game-a* hosts serve the asset files
        return cache_or_direct(cache_available && hostname.starts_with(GAME_CACHE_PREFIX));
    }

    if hostname.ends_with(PLATFORM_SUFFIX) {
        return cache_or_direct(cache_available && hostname.starts_with(PLATFORM_CACHE_PREFIX));
    }

    if hostname.ends_with(ORIGIN_IP_SUFFIX) || hostname.ends_with(BAIDU_SUFFIX) {
        return RoutingDecision::DirectOrigin;
    }

    RoutingDecision::Forbidden
}

fn cache_or_direct(use_cache: bool) -> RoutingDecision {
    if use_cache {
        RoutingDecision::CacheBackend
    } else {
        RoutingDecision::DirectOrigin
    }
}
