//! Session orchestrator.
//!
//! `AuthService` composes the password hasher, token codec, session store,
//! and audit log into the public authentication operations. It owns the
//! flow invariants: one live session pair per principal, serialized logins
//! per username, and re-mint-on-collision for token uniqueness.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use readhub_core::config::{AuthConfig, SessionConfig};
use readhub_core::error::AppError;
use readhub_core::result::{AppResult, SoftWrite};
use readhub_database::repositories::UserRepository;
use readhub_entity::session::{Session, SessionKind};
use readhub_entity::user::{CreateUser, UpdateProfile, User, UserProfile};

use crate::audit::LoginAuditLog;
use crate::password::PasswordHasher;
use crate::session::{LoginLockRegistry, SessionStore};
use crate::token::TokenCodec;

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Client platform tag (ios, android, web, ...).
    pub platform: String,
    pub device_id: Option<String>,
}

/// Login input.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub platform: String,
    pub device_id: Option<String>,
}

/// Password change input.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// A freshly issued (or refreshed) token pair.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires.
    pub access_expires_in: u64,
    /// Seconds until the refresh token expires.
    pub refresh_expires_in: u64,
    pub user: UserProfile,
}

/// Orchestrates registration, login, logout, refresh, and validation.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    codec: TokenCodec,
    store: SessionStore,
    audit: LoginAuditLog,
    login_locks: LoginLockRegistry,
    auth_config: AuthConfig,
    session_config: SessionConfig,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("session_config", &self.session_config)
            .finish()
    }
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: PasswordHasher,
        codec: TokenCodec,
        store: SessionStore,
        audit: LoginAuditLog,
        auth_config: AuthConfig,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            codec,
            store,
            audit,
            login_locks: LoginLockRegistry::new(),
            auth_config,
            session_config,
        }
    }

    /// Creates a new account and logs it straight in.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<LoginResponse> {
        validate_username(&request.username)?;
        validate_password(&request.password)?;

        let password_hash = self.hasher.hash_password(&request.password)?;
        let user = self
            .users
            .create(&CreateUser {
                username: request.username,
                password_hash,
                email: request.email,
                phone: request.phone,
            })
            .await?;

        info!(user_id = %user.id, "user registered");

        let (session_id, response) = self
            .issue_session_pair(&user, &request.platform, request.device_id.as_deref())
            .await?;
        self.audit
            .success(
                user.id,
                session_id,
                &request.platform,
                request.device_id.as_deref(),
            )
            .await;
        Ok(response)
    }

    /// Verifies credentials and issues a fresh session pair, revoking any
    /// previously live sessions for the user.
    ///
    /// Logins for the same username are serialized; see
    /// [`LoginLockRegistry`].
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        let _lock = self.login_locks.acquire(&request.username).await;

        // Unknown usernames get the same error as bad passwords, and no
        // audit entry since there is no principal to attribute it to.
        let user = self
            .users
            .find_by_username(&request.username)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        if !self
            .hasher
            .verify_password(&request.password, &user.password_hash)?
        {
            self.audit
                .failure(
                    user.id,
                    "invalid password",
                    &request.platform,
                    request.device_id.as_deref(),
                )
                .await;
            return Err(AppError::invalid_credentials());
        }

        // Hard failure here: continuing could leave two live pairs.
        self.store.invalidate_all_for_user(user.id, true).await?;

        let (session_id, response) = self
            .issue_session_pair(&user, &request.platform, request.device_id.as_deref())
            .await?;

        SoftWrite::from_result(self.users.update_last_login(user.id, Utc::now()).await)
            .log("update last login timestamp");
        self.audit
            .success(
                user.id,
                session_id,
                &request.platform,
                request.device_id.as_deref(),
            )
            .await;

        info!(user_id = %user.id, platform = %request.platform, "user logged in");
        Ok(response)
    }

    /// Terminates every session of the user owning this access token.
    pub async fn logout(&self, access_token: &str) -> AppResult<()> {
        let session = self.store.get(access_token, SessionKind::Access).await?;
        self.store
            .invalidate_all_for_user(session.user_id, true)
            .await?;
        info!(user_id = %session.user_id, "user logged out");
        Ok(())
    }

    /// Exchanges a live refresh token for a new access token.
    ///
    /// The refresh token is not rotated. A refresh session within its
    /// guard window of expiry is refused so clients re-authenticate
    /// instead of holding a pair that outlives its refresh anchor.
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<LoginResponse> {
        let claims = self.codec.parse(refresh_token)?;

        let refresh = self.store.get(refresh_token, SessionKind::Refresh).await?;
        if refresh.user_id != claims.sub {
            return Err(AppError::invalid_token("token subject mismatch"));
        }

        if refresh.remaining_seconds() < self.session_config.refresh_guard_seconds {
            return Err(AppError::unauthorized(
                "refresh token is about to expire, please log in again",
            ));
        }

        let user = self
            .users
            .find_by_id(refresh.user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::unauthorized("account is not available"))?;

        let previous_access = refresh.access_token.clone();
        let access_ttl = self
            .auth_config
            .access_ttl_seconds
            .min(refresh.remaining_seconds());

        let mut attempt = 0;
        let (new_access, updated_refresh) = loop {
            attempt += 1;
            let (token, expires_at) =
                self.codec.mint(user.id, user.display_name(), access_ttl)?;
            let candidate = Session::new(
                user.id,
                token,
                SessionKind::Access,
                &refresh.platform,
                refresh.device_id.as_deref(),
                expires_at,
            );
            match self.store.refresh_session(&candidate, refresh_token).await {
                Ok(updated) => break (candidate, updated),
                Err(e)
                    if e.is_duplicate()
                        && attempt < self.session_config.create_retry_attempts =>
                {
                    warn!(attempt, "access token collision during refresh, re-minting");
                }
                Err(e) => return Err(e),
            }
        };

        // The old access session is now orphaned; drop it best-effort.
        if let Some(old_token) = previous_access {
            SoftWrite::from_result(self.store.invalidate(&old_token, SessionKind::Access).await)
                .log("retire replaced access session");
        }

        Ok(LoginResponse {
            access_token: new_access.token,
            refresh_token: refresh_token.to_string(),
            access_expires_in: access_ttl,
            refresh_expires_in: updated_refresh.remaining_seconds(),
            user: UserProfile::from(&user),
        })
    }

    /// Resolves an access token to its live session.
    pub async fn validate_token(&self, access_token: &str) -> AppResult<Session> {
        self.codec.parse(access_token)?;
        self.store
            .get(access_token, SessionKind::Access)
            .await
            .map_err(|e| match e.kind {
                readhub_core::error::ErrorKind::SessionNotFound
                | readhub_core::error::ErrorKind::SessionExpired => {
                    AppError::unauthorized("invalid or expired access token")
                }
                _ => e,
            })
    }

    /// Fetches a user's public profile.
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;
        Ok(UserProfile::from(&user))
    }

    /// Applies a partial profile update and returns the new profile.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        changes: UpdateProfile,
    ) -> AppResult<UserProfile> {
        let user = self.users.update_profile(user_id, &changes).await?;
        Ok(UserProfile::from(&user))
    }

    /// Changes the password after verifying the current one.
    ///
    /// Existing sessions stay live; clients hold their tokens until they
    /// expire or the user logs out.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        validate_password(&request.new_password)?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user not found"))?;

        if !self
            .hasher
            .verify_password(&request.old_password, &user.password_hash)?
        {
            return Err(AppError::invalid_credentials());
        }

        let new_hash = self.hasher.hash_password(&request.new_password)?;
        self.users.update_password_hash(user.id, &new_hash).await?;
        info!(user_id = %user.id, "password changed");
        Ok(())
    }

    /// Mints and stores a fresh session pair, re-minting on token
    /// collisions up to the configured attempt budget.
    ///
    /// Returns the refresh session ID (for audit attribution) and the
    /// response handed to the client.
    async fn issue_session_pair(
        &self,
        user: &User,
        platform: &str,
        device_id: Option<&str>,
    ) -> AppResult<(Uuid, LoginResponse)> {
        let refresh_ttl = self.auth_config.refresh_ttl_seconds;
        // Access lifetime never exceeds its refresh anchor.
        let access_ttl = self.auth_config.access_ttl_seconds.min(refresh_ttl);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let (access_token, access_expires_at) =
                self.codec.mint(user.id, user.display_name(), access_ttl)?;
            let (refresh_token, refresh_expires_at) =
                self.codec.mint(user.id, user.display_name(), refresh_ttl)?;

            let access = Session::new(
                user.id,
                access_token.clone(),
                SessionKind::Access,
                platform,
                device_id,
                access_expires_at,
            );
            let mut refresh = Session::new(
                user.id,
                refresh_token.clone(),
                SessionKind::Refresh,
                platform,
                device_id,
                refresh_expires_at,
            );
            refresh.access_token = Some(access_token.clone());

            match self.store.create_pair(&access, &refresh).await {
                Ok(()) => {
                    return Ok((
                        refresh.id,
                        LoginResponse {
                            access_token,
                            refresh_token,
                            access_expires_in: access_ttl,
                            refresh_expires_in: refresh_ttl,
                            user: UserProfile::from(user),
                        },
                    ));
                }
                Err(e)
                    if e.is_duplicate()
                        && attempt < self.session_config.create_retry_attempts =>
                {
                    warn!(attempt, "token collision, re-minting session pair");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::validation(
            "username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::validation(
            "username may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < 8 {
        return Err(AppError::validation(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}
