//! Session issuing and validation.
//!
//! # Data Flow
//! ```text
//! POST /api/v1/auth/login
//!     → verify_credentials (cache-resident PanelUser / PanelPassword)
//!     → issue: {sub, role, iat, exp = iat + SessionTimeout, config_version}
//!     → HS256 signed bearer token
//!
//! protected request
//!     → validate: signature → expiry → config_version == cache.version()
//!     → SessionClaims into the request context
//! ```
//!
//! # Design Decisions
//! - No server-side session table: bumping the cache version revokes every
//!   outstanding token at once
//! - Invalidation is whole-config and coarse; an unrelated settings write
//!   also forces re-login
//! - Callers only learn expired vs. invalid vs. config-changed

pub mod claims;
pub mod error;

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sha2::{Digest, Sha256};

use crate::cache::ConfigCache;

pub use claims::{IssuedSession, SessionClaims};
pub use error::AuthError;

/// Role granted to the panel operator.
pub const ADMIN_ROLE: &str = "admin";

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub struct SessionManager {
    cache: Arc<ConfigCache>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionManager {
    pub fn new(cache: Arc<ConfigCache>, secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            cache,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Check a username/password pair against the configured panel
    /// credentials (built-in defaults before first-run initialization).
    pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
        username == self.cache.panel_user()
            && hash_password(password) == hash_password(&self.cache.panel_password())
    }

    /// Verify credentials and mint an admin session.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        if !self.verify_credentials(username, password) {
            tracing::warn!(username = %username, "Rejected login attempt");
            return Err(AuthError::InvalidCredentials);
        }
        self.issue(username, ADMIN_ROLE)
    }

    /// Mint a token bound to the current config version.
    pub fn issue(&self, subject: &str, role: &str) -> Result<IssuedSession, AuthError> {
        let iat = Utc::now().timestamp();
        let timeout = i64::try_from(self.cache.session_timeout().as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat,
            exp: iat.saturating_add(timeout),
            config_version: self.cache.version().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign token: {e}")))?;

        tracing::info!(
            subject = %claims.sub,
            config_version = %claims.config_version,
            expires_at = claims.exp,
            "Session issued"
        );
        Ok(IssuedSession {
            token,
            expires_at: claims.exp,
        })
    }

    /// Verify signature, expiry and config version of a token.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = ?e, "Token verification failed");
                    AuthError::InvalidToken
                }
            },
        )?;

        let current = self.cache.version().to_string();
        if data.claims.config_version != current {
            tracing::debug!(
                subject = %data.claims.sub,
                token_version = %data.claims.config_version,
                current_version = %current,
                "Token minted under an older configuration"
            );
            return Err(AuthError::ConfigChanged);
        }

        Ok(data.claims)
    }
}
