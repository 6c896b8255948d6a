//! Two-tier session store.
//!
//! Access sessions live only in the cache tier; losing one forces a token
//! refresh, nothing more. Refresh sessions are durable in Postgres with
//! the cache acting as a read-through/write-back layer, so a cache wipe
//! never logs users out. All cache writes are best-effort: failures are
//! logged and the durable tier remains the source of truth.

use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use tracing::warn;
use uuid::Uuid;

use readhub_cache::{CacheManager, keys};
use readhub_core::config::SessionConfig;
use readhub_core::error::AppError;
use readhub_core::result::{AppResult, SoftWrite};
use readhub_core::traits::CacheProvider;
use readhub_database::repositories::SessionRepository;
use readhub_entity::session::{Session, SessionKind};

/// How many times a durable insert is attempted on transient errors.
const INSERT_ATTEMPTS: u32 = 3;
/// Base backoff between insert attempts; grows linearly.
const INSERT_BACKOFF: Duration = Duration::from_millis(100);

/// Cache-fronted session storage with a durable refresh tier.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<CacheManager>,
    sessions: Arc<dyn SessionRepository>,
    jitter_max_seconds: u64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("jitter_max_seconds", &self.jitter_max_seconds)
            .finish()
    }
}

impl SessionStore {
    pub fn new(
        cache: Arc<CacheManager>,
        sessions: Arc<dyn SessionRepository>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            cache,
            sessions,
            jitter_max_seconds: config.ttl_jitter_max_seconds,
        }
    }

    fn cache_key(token: &str, kind: SessionKind) -> String {
        match kind {
            SessionKind::Access => keys::access_session(token),
            SessionKind::Refresh => keys::refresh_session(token),
        }
    }

    /// Cache TTL for a session: remaining lifetime plus random jitter, so
    /// entries cached in one burst do not all expire in the same instant.
    fn ttl_with_jitter(&self, session: &Session) -> Duration {
        let remaining = session.remaining_seconds();
        let jitter = if self.jitter_max_seconds == 0 {
            0
        } else {
            rand::rng().random_range(0..self.jitter_max_seconds)
        };
        Duration::from_secs(remaining.max(1) + jitter)
    }

    async fn cache_put(&self, session: &Session) -> SoftWrite {
        let key = Self::cache_key(&session.token, session.kind);
        let result = async {
            let json = serde_json::to_string(session)?;
            self.cache
                .set(&key, &json, self.ttl_with_jitter(session))
                .await
        };
        SoftWrite::from_result(result.await)
    }

    async fn cache_delete(&self, key: &str) -> SoftWrite {
        SoftWrite::from_result(self.cache.delete(key).await)
    }

    async fn index_add(&self, user_id: Uuid, session_keys: &[String]) -> SoftWrite {
        let index_key = keys::user_sessions(user_id);
        SoftWrite::from_result(self.cache.set_add(&index_key, session_keys).await)
    }

    async fn index_remove(&self, user_id: Uuid, session_key: &str) -> SoftWrite {
        let index_key = keys::user_sessions(user_id);
        SoftWrite::from_result(self.cache.set_remove(&index_key, session_key).await)
    }

    /// Whether a token already resolves to a live session of this kind.
    async fn resolves(&self, token: &str, kind: SessionKind) -> bool {
        self.get(token, kind).await.is_ok()
    }

    /// Stores a freshly minted access/refresh session pair.
    ///
    /// Both tokens are first checked for collisions against live sessions;
    /// a hit fails with `DuplicateToken` so the caller can re-mint. The
    /// refresh session is then inserted durably (the commit point), and
    /// only afterwards are both sessions cached and indexed best-effort.
    pub async fn create_pair(&self, access: &Session, refresh: &Session) -> AppResult<()> {
        debug_assert_eq!(access.kind, SessionKind::Access);
        debug_assert_eq!(refresh.kind, SessionKind::Refresh);

        if self.resolves(&access.token, SessionKind::Access).await {
            return Err(AppError::duplicate_token("access token already in use"));
        }
        if self.resolves(&refresh.token, SessionKind::Refresh).await {
            return Err(AppError::duplicate_token("refresh token already in use"));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sessions.insert(refresh).await {
                Ok(()) => break,
                // A unique-constraint hit means the collision pre-check
                // raced; retrying the same token cannot help.
                Err(e) if e.is_duplicate() => return Err(e),
                Err(e) if attempt < INSERT_ATTEMPTS => {
                    warn!(attempt, error = %e, "session insert failed, retrying");
                    tokio::time::sleep(INSERT_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }

        self.cache_put(access).await.log("cache access session");
        self.cache_put(refresh).await.log("cache refresh session");
        self.index_add(
            access.user_id,
            &[
                Self::cache_key(&access.token, SessionKind::Access),
                Self::cache_key(&refresh.token, SessionKind::Refresh),
            ],
        )
        .await
        .log("index session pair");

        Ok(())
    }

    /// Looks up a live session by token.
    ///
    /// Cache hits are checked against the session's own expiry; an expired
    /// entry is evicted and reported as `SessionExpired`. On a cache miss
    /// (or cache error, which is treated as a miss) refresh sessions fall
    /// back to the durable tier and are written back on success; access
    /// sessions have no durable tier and report `SessionNotFound`.
    pub async fn get(&self, token: &str, kind: SessionKind) -> AppResult<Session> {
        let key = Self::cache_key(token, kind);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => {
                    if session.is_expired() {
                        self.cache_delete(&key).await.log("evict expired session");
                        self.index_remove(session.user_id, &key)
                            .await
                            .log("unindex expired session");
                        if kind == SessionKind::Refresh {
                            SoftWrite::from_result(self.sessions.deactivate(token).await)
                                .log("deactivate expired refresh session");
                        }
                        return Err(AppError::session_expired("session has expired"));
                    }
                    return Ok(session);
                }
                Err(e) => {
                    warn!(error = %e, "cached session is undecodable, treating as miss");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "cache read failed, treating as miss");
            }
        }

        if kind == SessionKind::Refresh {
            let session = self
                .sessions
                .find_active_by_token(token)
                .await?
                .ok_or_else(|| AppError::session_not_found("refresh session not found"))?;

            if session.is_expired() {
                SoftWrite::from_result(self.sessions.deactivate(token).await)
                    .log("deactivate expired refresh session");
                return Err(AppError::session_expired("refresh session has expired"));
            }

            self.cache_put(&session).await.log("write back refresh session");
            self.index_add(session.user_id, std::slice::from_ref(&key))
                .await
                .log("re-index refresh session");
            return Ok(session);
        }

        Err(AppError::session_not_found("access session not found"))
    }

    /// Invalidates a single session.
    ///
    /// For refresh sessions the durable row is deactivated as well; cache
    /// removal alone would let a durable fallback resurrect it.
    pub async fn invalidate(&self, token: &str, kind: SessionKind) -> AppResult<()> {
        let key = Self::cache_key(token, kind);

        // Learn the owner before dropping the entry, for index upkeep.
        if let Ok(Some(raw)) = self.cache.get(&key).await {
            if let Ok(session) = serde_json::from_str::<Session>(&raw) {
                self.index_remove(session.user_id, &key)
                    .await
                    .log("unindex session");
            }
        }
        self.cache_delete(&key).await.log("delete cached session");

        if kind == SessionKind::Refresh {
            self.sessions.deactivate(token).await?;
        }
        Ok(())
    }

    /// Invalidates every session belonging to a user.
    ///
    /// Walks the user's session index, deletes each cached entry and the
    /// index itself, then (when `also_durable`) deactivates all durable
    /// rows. Idempotent: a missing index and zero affected rows are fine.
    pub async fn invalidate_all_for_user(
        &self,
        user_id: Uuid,
        also_durable: bool,
    ) -> AppResult<()> {
        let index_key = keys::user_sessions(user_id);
        let session_keys = self.cache.set_members(&index_key).await?;

        for key in &session_keys {
            self.cache_delete(key).await.log("delete cached session");
        }
        self.cache_delete(&index_key).await.log("delete session index");

        if also_durable {
            self.sessions.deactivate_all_for_user(user_id).await?;
        }
        Ok(())
    }

    /// Rebinds a refresh session to a newly minted access session.
    ///
    /// The durable back-reference update is the commit point; the refresh
    /// token itself is not rotated. Returns the updated refresh session.
    pub async fn refresh_session(
        &self,
        new_access: &Session,
        refresh_token: &str,
    ) -> AppResult<Session> {
        debug_assert_eq!(new_access.kind, SessionKind::Access);

        if self.resolves(&new_access.token, SessionKind::Access).await {
            return Err(AppError::duplicate_token("access token already in use"));
        }

        let mut refresh = self.get(refresh_token, SessionKind::Refresh).await?;

        let now = chrono::Utc::now();
        self.sessions
            .update_access_ref(refresh_token, &new_access.token, now)
            .await?;

        refresh.access_token = Some(new_access.token.clone());
        refresh.last_activity_at = now;

        self.cache_put(&refresh)
            .await
            .log("update cached refresh session");
        self.cache_put(new_access).await.log("cache new access session");
        self.index_add(
            new_access.user_id,
            &[Self::cache_key(&new_access.token, SessionKind::Access)],
        )
        .await
        .log("index new access session");

        Ok(refresh)
    }
}
