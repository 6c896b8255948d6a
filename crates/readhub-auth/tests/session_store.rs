//! Store-level behavior: tier fallback, expiry eviction, collisions, and
//! idempotent invalidation.

mod support;

use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use readhub_core::error::ErrorKind;
use readhub_entity::session::{Session, SessionKind};

use support::harness;

fn pair(user_id: Uuid, tag: &str) -> (Session, Session) {
    let now = Utc::now();
    let access = Session::new(
        user_id,
        format!("access-{tag}"),
        SessionKind::Access,
        "web",
        None,
        now + ChronoDuration::hours(2),
    );
    let mut refresh = Session::new(
        user_id,
        format!("refresh-{tag}"),
        SessionKind::Refresh,
        "web",
        None,
        now + ChronoDuration::days(30),
    );
    refresh.access_token = Some(access.token.clone());
    (access, refresh)
}

#[tokio::test]
async fn create_pair_rejects_colliding_tokens() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let (access, refresh) = pair(user_id, "one");
    h.store.create_pair(&access, &refresh).await.unwrap();

    // Same refresh token again, fresh access token.
    let (access2, _) = pair(user_id, "two");
    let err = h.store.create_pair(&access2, &refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateToken);

    // Same access token again, fresh refresh token.
    let (_, refresh2) = pair(user_id, "three");
    let err = h.store.create_pair(&access, &refresh2).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateToken);
}

#[tokio::test]
async fn expired_cached_session_is_evicted_on_read() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let now = Utc::now();
    let access = Session::new(
        user_id,
        "access-stale".to_string(),
        SessionKind::Access,
        "web",
        None,
        now - ChronoDuration::minutes(1),
    );
    let mut refresh = Session::new(
        user_id,
        "refresh-stale".to_string(),
        SessionKind::Refresh,
        "web",
        None,
        now - ChronoDuration::minutes(1),
    );
    refresh.access_token = Some(access.token.clone());
    h.store.create_pair(&access, &refresh).await.unwrap();

    let err = h.store.get("refresh-stale", SessionKind::Refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionExpired);

    // The durable row was deactivated, so the next read cannot resurrect
    // it through the fallback path.
    let err = h.store.get("refresh-stale", SessionKind::Refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionNotFound);

    let err = h.store.get("access-stale", SessionKind::Access).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionExpired);
    let err = h.store.get("access-stale", SessionKind::Access).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionNotFound);
}

#[tokio::test]
async fn invalidate_refresh_reaches_the_durable_tier() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let (access, refresh) = pair(user_id, "a");
    h.store.create_pair(&access, &refresh).await.unwrap();

    h.store.invalidate(&refresh.token, SessionKind::Refresh).await.unwrap();

    let err = h.store.get(&refresh.token, SessionKind::Refresh).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionNotFound);
    assert_eq!(h.sessions.active_count_for(user_id), 0);
}

#[tokio::test]
async fn invalidate_all_is_idempotent() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let (access, refresh) = pair(user_id, "a");
    h.store.create_pair(&access, &refresh).await.unwrap();

    h.store.invalidate_all_for_user(user_id, true).await.unwrap();
    // Second pass finds nothing and still succeeds.
    h.store.invalidate_all_for_user(user_id, true).await.unwrap();

    assert_eq!(h.sessions.active_count_for(user_id), 0);
    assert!(h.store.get(&access.token, SessionKind::Access).await.is_err());
    assert!(h.store.get(&refresh.token, SessionKind::Refresh).await.is_err());
}

#[tokio::test]
async fn refresh_session_updates_the_back_reference() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let (access, refresh) = pair(user_id, "a");
    h.store.create_pair(&access, &refresh).await.unwrap();

    let new_access = Session::new(
        user_id,
        "access-next".to_string(),
        SessionKind::Access,
        "web",
        None,
        Utc::now() + ChronoDuration::hours(2),
    );
    let updated = h.store.refresh_session(&new_access, &refresh.token).await.unwrap();

    assert_eq!(updated.access_token.as_deref(), Some("access-next"));
    assert_eq!(updated.token, refresh.token);
    assert!(updated.last_activity_at >= refresh.last_activity_at);

    // The new access session resolves.
    let fetched = h.store.get("access-next", SessionKind::Access).await.unwrap();
    assert_eq!(fetched.user_id, user_id);
}

#[tokio::test]
async fn refresh_session_rejects_a_colliding_access_token() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let (access, refresh) = pair(user_id, "a");
    h.store.create_pair(&access, &refresh).await.unwrap();

    // Reusing the live access token as the "new" one must fail.
    let err = h.store.refresh_session(&access, &refresh.token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateToken);
}

#[tokio::test]
async fn refresh_session_for_unknown_refresh_token_fails() {
    let h = harness();
    let new_access = Session::new(
        Uuid::new_v4(),
        "access-x".to_string(),
        SessionKind::Access,
        "web",
        None,
        Utc::now() + ChronoDuration::hours(2),
    );
    let err = h.store.refresh_session(&new_access, "refresh-missing").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionNotFound);
}
