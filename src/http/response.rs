//! Responses generated by the proxy itself.
//!
//! Upstream responses pass through untouched; everything the proxy answers
//! on its own carries the fixed `Server` header.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Product string sent in the `Server` header.
pub const SERVER_NAME: &str = "Granblue Proxy 0.1-alpha";

/// Plain-text error response with the proxy's `Server` header.
pub fn error_response(status: StatusCode, reason: &'static str) -> Response {
    let mut response = (status, reason).into_response();
    response
        .headers_mut()
        .insert(header::SERVER, HeaderValue::from_static(SERVER_NAME));
    response
}

/// Response used when a handler panics.
pub fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response<Body> {
    tracing::error!("Forwarding panicked, answering 503");
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Internal server error")
}

/// Status line plus `Server` header, as written on raw tunnel connections.
pub fn raw_status(code: u16, reason: &str) -> String {
    format!("HTTP/1.1 {} {}\r\nServer: {}\r\n\r\n", code, reason, SERVER_NAME)
}
