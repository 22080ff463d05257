//! Secret entrance gate.
//!
//! Hides the panel UI behind an operator-chosen path. Visiting that path mints
//! a short-lived random possession cookie; every other UI path requires the
//! cookie. API and asset paths are never gated here (sessions protect the
//! API).

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, Request, StatusCode,
    },
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use rand::{rngs::OsRng, RngCore};

use crate::cache::ConfigCache;
use crate::observability::metrics;

pub const SESSION_COOKIE: &str = "sessionkey";
pub const SESSION_COOKIE_TTL_SECS: u64 = 30 * 60;
pub const LOGIN_PATH: &str = "/login";

const BYPASS_PREFIXES: [&str; 2] = ["/api", "/assets"];

/// Identical for every rejected path so guesses cannot be told apart.
pub const DENY_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Temporarily unavailable</title>
    <style>
        body { font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; background: #F5F5F5;
               min-height: 100vh; margin: 0; display: flex; align-items: center; justify-content: center; }
        .card { background: #FFF; border-radius: 8px; box-shadow: 0 2px 10px rgba(0,0,0,.05);
                padding: 32px 40px; max-width: 500px; text-align: center; }
        h1 { font-size: 22px; color: #333; }
        p { font-size: 15px; color: #666; line-height: 1.6; }
        code { display: inline-block; background: #EFEFEF; border-radius: 4px; padding: 8px 12px;
               font-family: 'Courier New', monospace; color: #333; }
    </style>
</head>
<body>
    <div class="card">
        <h1>Temporarily unavailable</h1>
        <p>This panel is protected by a secure entrance.</p>
        <p>Run the following command in a terminal on the server to look up the entrance:</p>
        <code>panelctl user-info</code>
    </div>
</body>
</html>
"#;

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntranceDecision {
    /// API or static asset path; not gated.
    Bypass,
    /// No secret entrance configured.
    Open,
    /// The secret entrance itself was visited; issue this cookie value.
    Mint(String),
    /// Possession cookie present.
    Admit,
    /// Missing possession cookie.
    Deny,
}

/// Ensure the entrance starts with `/`.
pub fn normalize_entrance(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

fn is_bypassed(path: &str) -> bool {
    BYPASS_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

fn generate_cookie_value() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn cookie_from_headers<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|h| h.split(';'))
        .map(str::trim)
        .find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k.trim() == name).then(|| v.trim())
        })
}

/// `Set-Cookie` value for a freshly minted possession cookie.
pub fn possession_cookie(value: &str) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, value, SESSION_COOKIE_TTL_SECS
    )
}

pub struct EntranceGate {
    cache: Arc<ConfigCache>,
}

impl EntranceGate {
    pub fn new(cache: Arc<ConfigCache>) -> Self {
        Self { cache }
    }

    /// Decide for a request path and its possession cookie, if any.
    pub fn decide(&self, path: &str, cookie: Option<&str>) -> EntranceDecision {
        if is_bypassed(path) {
            return EntranceDecision::Bypass;
        }

        let entrance = normalize_entrance(&self.cache.security_entrance());
        if entrance == "/" {
            return EntranceDecision::Open;
        }

        if path == entrance {
            return EntranceDecision::Mint(generate_cookie_value());
        }

        match cookie {
            Some(value) if !value.is_empty() => EntranceDecision::Admit,
            _ => EntranceDecision::Deny,
        }
    }
}

/// Middleware applying the entrance gate to every request.
pub async fn entrance_middleware(
    State(gate): State<Arc<EntranceGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cookie = cookie_from_headers(request.headers(), SESSION_COOKIE);

    match gate.decide(request.uri().path(), cookie) {
        EntranceDecision::Bypass | EntranceDecision::Open | EntranceDecision::Admit => {
            next.run(request).await
        }
        EntranceDecision::Mint(value) => {
            tracing::info!("Secure entrance visited, possession cookie issued");
            metrics::record_entrance_event("minted");
            let cookie = possession_cookie(&value);

            // An entrance on the login page itself would redirect forever.
            if request.uri().path() == LOGIN_PATH {
                let mut response = next.run(request).await;
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                return response;
            }

            (
                StatusCode::FOUND,
                [(LOCATION, LOGIN_PATH.to_string()), (SET_COOKIE, cookie)],
            )
                .into_response()
        }
        EntranceDecision::Deny => {
            tracing::debug!(path = %request.uri().path(), "Entrance gate denied request");
            metrics::record_entrance_event("denied");
            (StatusCode::NOT_FOUND, Html(DENY_PAGE)).into_response()
        }
    }
}
