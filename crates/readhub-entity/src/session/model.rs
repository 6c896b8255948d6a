//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Distinguishes the two halves of a session pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Short-lived credential used to authorize individual requests.
    /// Cache-resident only, never durably persisted.
    Access,
    /// Longer-lived credential used solely to mint new access tokens.
    /// Durably persisted and reconstructible after a cache eviction.
    Refresh,
}

/// One issued token, keyed by its own (cryptographically unpredictable)
/// token value.
///
/// Refresh sessions are stored in both the durable store and the cache;
/// access sessions live only in the cache and are reconstructible only by
/// re-authenticating.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Unique session identifier (referenced by audit entries).
    pub id: Uuid,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// The signed token value. Unique across all sessions.
    pub token: String,
    /// Access or refresh.
    pub kind: SessionKind,
    /// Client platform tag (ios, android, web, ...).
    pub platform: String,
    /// Client device identifier.
    pub device_id: Option<String>,
    /// For refresh sessions: the currently associated access token.
    /// Informational back-reference, not an ownership edge.
    pub access_token: Option<String>,
    /// Whether the session is live. Cleared instead of deleting the row.
    pub is_active: bool,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// Last activity timestamp, bumped on refresh.
    pub last_activity_at: DateTime<Utc>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build a new live session with the given expiry.
    pub fn new(
        user_id: Uuid,
        token: String,
        kind: SessionKind,
        platform: &str,
        device_id: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token,
            kind,
            platform: platform.to_string(),
            device_id: device_id.map(str::to_string),
            access_token: None,
            is_active: true,
            expires_at,
            last_activity_at: now,
            created_at: now,
        }
    }

    /// Whether the session's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Remaining lifetime in whole seconds (0 if expired).
    pub fn remaining_seconds(&self) -> u64 {
        let remaining = (self.expires_at - Utc::now()).num_seconds();
        if remaining > 0 { remaining as u64 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry_and_remaining() {
        let live = Session::new(
            Uuid::new_v4(),
            "tok".into(),
            SessionKind::Access,
            "web",
            None,
            Utc::now() + Duration::seconds(120),
        );
        assert!(!live.is_expired());
        assert!(live.remaining_seconds() <= 120);
        assert!(live.remaining_seconds() >= 118);

        let dead = Session::new(
            Uuid::new_v4(),
            "tok2".into(),
            SessionKind::Refresh,
            "web",
            None,
            Utc::now() - Duration::seconds(1),
        );
        assert!(dead.is_expired());
        assert_eq!(dead.remaining_seconds(), 0);
    }
}
