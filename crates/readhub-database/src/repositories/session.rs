//! Session repository trait and Postgres implementation.
//!
//! Only refresh-kind sessions are ever persisted; access sessions are
//! cache-resident and never reach this repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use readhub_core::error::{AppError, ErrorKind};
use readhub_core::result::AppResult;
use readhub_entity::session::Session;

use super::map_sqlx_error;

/// Durable refresh-session operations.
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Insert a refresh session. A token collision surfaces as
    /// `DuplicateToken`.
    async fn insert(&self, session: &Session) -> AppResult<()>;

    /// Find the active session for a token, regardless of expiry.
    /// Expiry is judged by the caller so it can deactivate stale rows.
    async fn find_active_by_token(&self, token: &str) -> AppResult<Option<Session>>;

    /// Update a refresh session's access-token back-reference and
    /// last-activity timestamp. Fails with `SessionNotFound` if no
    /// active row matches.
    async fn update_access_ref(
        &self,
        refresh_token: &str,
        access_token: &str,
        last_activity_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Mark a session inactive.
    async fn deactivate(&self, token: &str) -> AppResult<()>;

    /// Mark all of a user's active sessions inactive. Returns the number
    /// of rows affected; zero is not an error.
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// Postgres-backed [`SessionRepository`].
#[derive(Debug, Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions \
                (id, user_id, token, kind, platform, device_id, access_token, \
                 is_active, expires_at, last_activity_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.token)
        .bind(session.kind)
        .bind(&session.platform)
        .bind(&session.device_id)
        .bind(&session.access_token)
        .bind(session.is_active)
        .bind(session.expires_at)
        .bind(session.last_activity_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| map_sqlx_error(e, "Failed to insert session", ErrorKind::DuplicateToken))
    }

    async fn find_active_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE token = $1 AND is_active = TRUE",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find session by token", e)
        })
    }

    async fn update_access_ref(
        &self,
        refresh_token: &str,
        access_token: &str,
        last_activity_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET access_token = $2, last_activity_at = $3 \
             WHERE token = $1 AND is_active = TRUE",
        )
        .bind(refresh_token)
        .bind(access_token)
        .bind(last_activity_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update refresh session", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::session_not_found("Refresh session not found"));
        }
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> AppResult<()> {
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to deactivate session", e)
            })?;
        Ok(())
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to deactivate user sessions", e)
        })?;
        Ok(result.rows_affected())
    }
}
