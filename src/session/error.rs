//! Session errors and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Why a login or an authenticated request was refused.
///
/// Token verification failures collapse into `TokenExpired` or
/// `InvalidToken`; the specific failed check is only logged server-side.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header required")]
    MissingToken,

    #[error("invalid authorization format")]
    InvalidAuthHeader,

    #[error("token expired, please login again")]
    TokenExpired,

    #[error("invalid token")]
    InvalidToken,

    #[error("configuration has been changed, please login again")]
    ConfigChanged,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code, also used as a metric label.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::ConfigChanged => "config_changed",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub error: String,
    pub error_code: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error = match &self {
            // Never echo internals to the client.
            AuthError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        let body = Json(AuthErrorResponse {
            error,
            error_code: self.code(),
        });
        (self.status(), body).into_response()
    }
}
