//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session store and orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound for random cache TTL jitter in seconds.
    ///
    /// Each cached session entry lives for its remaining lifetime plus a
    /// random amount below this bound, so a burst of logins does not
    /// produce a synchronized mass-expiry later.
    #[serde(default = "default_ttl_jitter")]
    pub ttl_jitter_max_seconds: u64,
    /// Minimum remaining refresh-session lifetime required to serve a
    /// token refresh. Below this the client must log in again.
    #[serde(default = "default_refresh_guard")]
    pub refresh_guard_seconds: u64,
    /// How many times a session-pair creation is attempted before giving
    /// up on token collisions.
    #[serde(default = "default_create_retries")]
    pub create_retry_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_jitter_max_seconds: default_ttl_jitter(),
            refresh_guard_seconds: default_refresh_guard(),
            create_retry_attempts: default_create_retries(),
        }
    }
}

fn default_ttl_jitter() -> u64 {
    300
}

fn default_refresh_guard() -> u64 {
    3600
}

fn default_create_retries() -> u32 {
    3
}
