//! Claims payload embedded in every session token.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims payload for access and refresh tokens.
///
/// Access and refresh tokens share one shape and differ only in TTL; which
/// role a token plays is decided by the session store tier it is looked up
/// in, not by the token itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Username for convenience.
    pub username: String,
    /// Random nonce so two tokens minted in the same second for the same
    /// user still differ.
    pub nonce: Uuid,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}
