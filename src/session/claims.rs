//! Session token claims.

use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
///
/// `config_version` is the config cache version at issuance and is never
/// refreshed; any later version bump invalidates the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub config_version: String,
}

/// A freshly minted token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: i64,
}
