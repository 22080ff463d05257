//! Request correlation.
//!
//! The request ID is assigned by tower-http's `SetRequestIdLayer` before
//! tracing starts, so every log line for a request carries it.

use axum::{body::Body, http::Request};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID set on the request, or `"unknown"`.
pub fn request_id(request: &Request<Body>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span factory for `TraceLayer`.
pub fn make_request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request),
        method = %request.method(),
        path = %request.uri().path(),
    )
}
