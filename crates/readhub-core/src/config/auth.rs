//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Access token TTL in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_seconds: u64,
    /// Refresh token TTL in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_seconds: u64,
    /// Argon2 memory cost in KiB. `None` uses the library default.
    #[serde(default)]
    pub argon2_memory_kib: Option<u32>,
    /// Argon2 iteration count. `None` uses the library default.
    #[serde(default)]
    pub argon2_iterations: Option<u32>,
    /// Argon2 lane count. `None` uses the library default.
    #[serde(default)]
    pub argon2_parallelism: Option<u32>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_ttl_seconds: default_access_ttl(),
            refresh_ttl_seconds: default_refresh_ttl(),
            argon2_memory_kib: None,
            argon2_iterations: None,
            argon2_parallelism: None,
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_access_ttl() -> u64 {
    // 2 hours
    7200
}

fn default_refresh_ttl() -> u64 {
    // 30 days
    2_592_000
}
