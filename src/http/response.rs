//! API error responses.
//!
//! Every `/api` failure renders as `{"error": ..., "error_code": ...}` so the
//! UI can branch on the code. Session failures keep their own codes
//! (`token_expired`, `config_changed`, ...) by delegating to [`AuthError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::session::AuthError;
use crate::settings::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: &'static str,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(e) => e.status(),
            Self::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Store(StoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
            Self::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_)) => "not_found",
            Self::Store(StoreError::AlreadyExists(_)) => "conflict",
            Self::Auth(e) => e.code(),
            Self::Store(StoreError::Unavailable(_)) => "store_unavailable",
            Self::Store(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Store(StoreError::NotFound(key)) => format!("setting not found: {key}"),
            Self::Store(StoreError::AlreadyExists(key)) => format!("setting already exists: {key}"),
            Self::Store(StoreError::Unavailable(_)) => "settings store unavailable".to_string(),
            Self::Store(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Auth(auth) = self {
            return auth.into_response();
        }

        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "API request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "API request rejected");
        }

        let body = Json(ErrorBody {
            error: self.client_message(),
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
