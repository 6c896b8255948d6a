//! Cache key builders for all ReadHub cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the application uses.

use uuid::Uuid;

/// Cache key for an access session, keyed by its token value.
pub fn access_session(token: &str) -> String {
    format!("access_session:{token}")
}

/// Cache key for a refresh session, keyed by its token value.
pub fn refresh_session(token: &str) -> String {
    format!("refresh_session:{token}")
}

/// Key of the set holding every live session cache key for a user.
/// Read by bulk invalidation.
pub fn user_sessions(user_id: Uuid) -> String {
    format!("user_sessions:{user_id}")
}
