//! Login audit entry model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data for appending a login audit entry. Entries are created once and
/// never mutated, deleted, or read back by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoginAudit {
    /// The principal the attempt was made against.
    pub user_id: Uuid,
    /// The refresh session created by a successful attempt.
    pub session_id: Option<Uuid>,
    /// Authentication mechanism.
    pub login_type: String,
    /// Client platform tag.
    pub platform: String,
    /// Client device identifier.
    pub device_id: Option<String>,
    /// Whether the attempt succeeded.
    pub is_success: bool,
    /// Why the attempt failed, when it did.
    pub failure_reason: Option<String>,
}
