//! Login audit repository trait and Postgres implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use readhub_core::error::{AppError, ErrorKind};
use readhub_core::result::AppResult;
use readhub_entity::audit::CreateLoginAudit;

/// Append-only login audit writes.
#[async_trait]
pub trait LoginLogRepository: Send + Sync + 'static {
    /// Append one audit entry.
    async fn insert(&self, entry: &CreateLoginAudit) -> AppResult<()>;
}

/// Postgres-backed [`LoginLogRepository`].
#[derive(Debug, Clone)]
pub struct PgLoginLogRepository {
    pool: PgPool,
}

impl PgLoginLogRepository {
    /// Create a new login log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginLogRepository for PgLoginLogRepository {
    async fn insert(&self, entry: &CreateLoginAudit) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO login_audit \
                (id, user_id, session_id, login_type, platform, device_id, \
                 is_success, failure_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.session_id)
        .bind(&entry.login_type)
        .bind(&entry.platform)
        .bind(&entry.device_id)
        .bind(entry.is_success)
        .bind(&entry.failure_reason)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert login audit", e))
    }
}
