//! User repository trait and Postgres implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use readhub_core::error::{AppError, ErrorKind};
use readhub_core::result::AppResult;
use readhub_entity::user::{CreateUser, UpdateProfile, User};

use super::map_sqlx_error;

/// Principal CRUD operations. Users are created on register, mutated by
/// profile/password operations, and never hard-deleted.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Create a user. Duplicate usernames surface as `Conflict`.
    async fn create(&self, user: &CreateUser) -> AppResult<User>;

    /// Find an active user by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find an active user by username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Apply a partial profile update and return the updated user.
    async fn update_profile(&self, id: Uuid, changes: &UpdateProfile) -> AppResult<User>;

    /// Replace the stored password hash.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Record a successful login time.
    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Postgres-backed [`UserRepository`].
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to create user", ErrorKind::Conflict))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = TRUE")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user by id", e))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1) AND is_active = TRUE",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find user by username", e)
        })
    }

    async fn update_profile(&self, id: Uuid, changes: &UpdateProfile) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET \
                nickname = COALESCE($2, nickname), \
                bio = COALESCE($3, bio), \
                avatar_url = COALESCE($4, avatar_url), \
                updated_at = NOW() \
             WHERE id = $1 AND is_active = TRUE RETURNING *",
        )
        .bind(id)
        .bind(&changes.nickname)
        .bind(&changes.bio)
        .bind(&changes.avatar_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update profile", e))?
        .ok_or_else(|| AppError::not_found("User not found"))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() \
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update password", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update last login", e)
            })?;
        Ok(())
    }
}
