//! Request inspection and outbound request preparation.
//!
//! # Responsibilities
//! - Find the destination authority (absolute-form target, else `Host`)
//! - Build the outbound URL for the chosen upstream
//! - Copy headers minus the inbound framing

use axum::http::{header, uri::Authority, HeaderMap, Request, Uri};

/// Destination authority of a proxied request.
///
/// Proxy clients send absolute-form targets; plain clients only send `Host`.
pub fn authority<B>(req: &Request<B>) -> Option<Authority> {
    if let Some(authority) = req.uri().authority() {
        return Some(authority.clone());
    }
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.parse::<Authority>().ok())
}

/// Hostname without the port, or `""` when the request names no host.
pub fn hostname(authority: Option<&Authority>) -> &str {
    authority.map(Authority::host).unwrap_or("")
}

/// Absolute URL for the upstream request: the inbound scheme, path and query
/// on `authority`.
pub fn outbound_url(uri: &Uri, authority: &str) -> Result<reqwest::Url, String> {
    let scheme = uri.scheme_str().unwrap_or("http");
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let raw = format!("{}://{}{}", scheme, authority, path_and_query);
    reqwest::Url::parse(&raw).map_err(|e| format!("invalid upstream url '{}': {}", raw, e))
}

/// Inbound headers for the outbound request.
///
/// The body is re-framed by the client, so the inbound framing headers are
/// dropped. `Host` is kept as sent.
pub fn outbound_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);
    headers
}
