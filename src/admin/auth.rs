//! Session validation for protected API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;
use crate::observability::metrics;
use crate::session::{AuthError, SessionClaims};

/// Authenticated caller, available to handlers behind [`require_session`].
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub username: String,
    pub role: String,
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Reject the request unless it carries a token that verifies, has not
/// expired and was minted under the current configuration version.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let verified = bearer_token(request.headers()).and_then(|token| state.sessions.validate(token));

    match verified {
        Ok(claims) => {
            request.extensions_mut().insert(CurrentUser::from(claims));
            next.run(request).await
        }
        Err(e) => {
            metrics::record_session_rejection(e.code());
            tracing::debug!(
                path = %request.uri().path(),
                reason = e.code(),
                "Session rejected"
            );
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));
        for bad in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc.def.ghi"] {
            assert!(
                matches!(bearer_token(&headers(bad)), Err(AuthError::InvalidAuthHeader)),
                "{bad:?}"
            );
        }
    }
}
