//! Best-effort login audit recording.
//!
//! Audit entries are appended inline with the login flow, but a failed
//! append never fails the login: the outcome is logged and swallowed.

use std::sync::Arc;

use uuid::Uuid;

use readhub_core::result::SoftWrite;
use readhub_database::repositories::LoginLogRepository;
use readhub_entity::audit::CreateLoginAudit;

const LOGIN_TYPE_PASSWORD: &str = "password";

/// Append-only login audit log.
#[derive(Clone)]
pub struct LoginAuditLog {
    repo: Arc<dyn LoginLogRepository>,
}

impl std::fmt::Debug for LoginAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginAuditLog").finish()
    }
}

impl LoginAuditLog {
    pub fn new(repo: Arc<dyn LoginLogRepository>) -> Self {
        Self { repo }
    }

    /// Records a successful password login tied to its refresh session.
    pub async fn success(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        platform: &str,
        device_id: Option<&str>,
    ) {
        self.append(CreateLoginAudit {
            user_id,
            session_id: Some(session_id),
            login_type: LOGIN_TYPE_PASSWORD.to_string(),
            platform: platform.to_string(),
            device_id: device_id.map(str::to_string),
            is_success: true,
            failure_reason: None,
        })
        .await;
    }

    /// Records a failed password login attempt against a known principal.
    pub async fn failure(
        &self,
        user_id: Uuid,
        reason: &str,
        platform: &str,
        device_id: Option<&str>,
    ) {
        self.append(CreateLoginAudit {
            user_id,
            session_id: None,
            login_type: LOGIN_TYPE_PASSWORD.to_string(),
            platform: platform.to_string(),
            device_id: device_id.map(str::to_string),
            is_success: false,
            failure_reason: Some(reason.to_string()),
        })
        .await;
    }

    async fn append(&self, entry: CreateLoginAudit) {
        SoftWrite::from_result(self.repo.insert(&entry).await).log("append login audit entry");
    }
}
