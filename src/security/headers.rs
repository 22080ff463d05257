//! Security response headers.
//!
//! # Responsibilities
//! - Anti-framing, MIME sniffing and referrer policy headers on every response
//! - Path dependent Content-Security-Policy (API responses get a strict one)
//! - HSTS only when the request reached us over HTTPS, directly or through a
//!   proxy that reports it

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

const UI_CSP: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: https:; \
    font-src 'self' data:; \
    connect-src 'self'; \
    object-src 'none'; \
    base-uri 'self'; \
    form-action 'self';";

const API_CSP: &str = "default-src 'self'; connect-src 'self'; frame-ancestors 'none';";

const HSTS: &str = "max-age=31536000; includeSubDomains; preload";

fn csp_for(path: &str) -> &'static str {
    if path == "/api" || path.starts_with("/api/") {
        API_CSP
    } else {
        UI_CSP
    }
}

fn is_https(request: &Request<Body>) -> bool {
    let forwarded = |headers: &HeaderMap, name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"))
    };
    request.uri().scheme_str() == Some("https")
        || forwarded(request.headers(), "x-forwarded-proto")
        || forwarded(request.headers(), "x-real-proto")
}

pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let csp = csp_for(request.uri().path());
    let https = is_https(&request);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(csp));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    if https {
        headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .fallback(|| async { "ok" })
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    #[tokio::test]
    async fn test_headers_on_ui_and_api() {
        let res = app()
            .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(res.headers()[header::CONTENT_SECURITY_POLICY], UI_CSP);
        assert!(res.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());

        let res = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .header("X-Forwarded-Proto", "HTTPS")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()[header::CONTENT_SECURITY_POLICY], API_CSP);
        assert_eq!(res.headers()[header::STRICT_TRANSPORT_SECURITY], HSTS);
    }
}
