//! In-memory test doubles for the repository traits and a controllable
//! cache provider, plus a harness wiring them into a full `AuthService`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use readhub_auth::{AuthService, LoginAuditLog, PasswordHasher, SessionStore, TokenCodec};
use readhub_cache::CacheManager;
use readhub_cache::memory::MemoryCacheProvider;
use readhub_core::config::cache::MemoryCacheConfig;
use readhub_core::config::{AuthConfig, SessionConfig};
use readhub_core::error::AppError;
use readhub_core::result::AppResult;
use readhub_core::traits::cache::CacheProvider;
use readhub_database::repositories::{LoginLogRepository, SessionRepository, UserRepository};
use readhub_entity::audit::CreateLoginAudit;
use readhub_entity::session::Session;
use readhub_entity::user::{CreateUser, UpdateProfile, User};

#[derive(Debug, Default)]
pub struct MemoryUserRepo {
    users: Mutex<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepository for MemoryUserRepo {
    async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(AppError::conflict("username already taken"));
        }
        let now = Utc::now();
        let created = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            password_hash: user.password_hash.clone(),
            nickname: None,
            bio: None,
            avatar_url: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.is_active && u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, changes: &UpdateProfile) -> AppResult<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("user not found"))?;
        if let Some(nickname) = &changes.nickname {
            user.nickname = Some(nickname.clone());
        }
        if let Some(bio) = &changes.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(avatar_url) = &changes.avatar_url {
            user.avatar_url = Some(avatar_url.clone());
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("user not found"))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("user not found"))?;
        user.last_login_at = Some(at);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionRepo {
    sessions: Mutex<Vec<Session>>,
}

impl MemorySessionRepo {
    pub fn active_count_for(&self, user_id: Uuid) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id && s.is_active)
            .count()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepo {
    async fn insert(&self, session: &Session) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.iter().any(|s| s.token == session.token) {
            return Err(AppError::duplicate_token("token already stored"));
        }
        sessions.push(session.clone());
        Ok(())
    }

    async fn find_active_by_token(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.is_active && s.token == token)
            .cloned())
    }

    async fn update_access_ref(
        &self,
        refresh_token: &str,
        access_token: &str,
        last_activity_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.is_active && s.token == refresh_token)
            .ok_or_else(|| AppError::session_not_found("refresh session not found"))?;
        session.access_token = Some(access_token.to_string());
        session.last_activity_at = last_activity_at;
        Ok(())
    }

    async fn deactivate(&self, token: &str) -> AppResult<()> {
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.iter_mut().filter(|s| s.token == token) {
            session.is_active = false;
        }
        Ok(())
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut sessions = self.sessions.lock().unwrap();
        let mut affected = 0;
        for session in sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            session.is_active = false;
            affected += 1;
        }
        Ok(affected)
    }
}

#[derive(Debug, Default)]
pub struct MemoryLoginLogRepo {
    entries: Mutex<Vec<CreateLoginAudit>>,
    pub fail: AtomicBool,
}

impl MemoryLoginLogRepo {
    pub fn entries(&self) -> Vec<CreateLoginAudit> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoginLogRepository for MemoryLoginLogRepo {
    async fn insert(&self, entry: &CreateLoginAudit) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::database("audit table unavailable"));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Cache provider whose writes can be made to fail on demand.
#[derive(Debug)]
pub struct FlakyCacheProvider {
    inner: MemoryCacheProvider,
    pub fail_writes: AtomicBool,
}

impl FlakyCacheProvider {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheProvider::new(&MemoryCacheConfig {
                max_capacity: 1000,
                time_to_live_seconds: 600,
            }),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn write_gate(&self) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::cache("cache write refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheProvider for FlakyCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.write_gate()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.write_gate()?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }

    async fn set_add(&self, key: &str, members: &[String]) -> AppResult<()> {
        self.write_gate()?;
        self.inner.set_add(key, members).await
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        self.write_gate()?;
        self.inner.set_remove(key, member).await
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.inner.set_members(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.inner.flush_all().await
    }
}

pub struct Harness {
    pub service: AuthService,
    pub users: Arc<MemoryUserRepo>,
    pub sessions: Arc<MemorySessionRepo>,
    pub audit: Arc<MemoryLoginLogRepo>,
    pub cache: Arc<FlakyCacheProvider>,
    pub store: SessionStore,
}

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        access_ttl_seconds: 3600,
        refresh_ttl_seconds: 86_400,
        // Cheap hashing keeps the suite fast.
        argon2_memory_kib: Some(8),
        argon2_iterations: Some(1),
        argon2_parallelism: Some(1),
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        ttl_jitter_max_seconds: 0,
        refresh_guard_seconds: 3600,
        create_retry_attempts: 3,
    }
}

pub fn harness_with(auth_cfg: AuthConfig, session_cfg: SessionConfig) -> Harness {
    let users = Arc::new(MemoryUserRepo::default());
    let sessions = Arc::new(MemorySessionRepo::default());
    let audit = Arc::new(MemoryLoginLogRepo::default());
    let cache = Arc::new(FlakyCacheProvider::new());

    let manager = Arc::new(CacheManager::from_provider(
        cache.clone() as Arc<dyn CacheProvider>
    ));
    let store = SessionStore::new(manager, sessions.clone(), &session_cfg);

    let service = AuthService::new(
        users.clone(),
        PasswordHasher::new(&auth_cfg).unwrap(),
        TokenCodec::new(&auth_cfg),
        store.clone(),
        LoginAuditLog::new(audit.clone()),
        auth_cfg,
        session_cfg,
    );

    Harness {
        service,
        users,
        sessions,
        audit,
        cache,
        store,
    }
}

pub fn harness() -> Harness {
    harness_with(auth_config(), session_config())
}
