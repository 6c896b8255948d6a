//! Per-username login locks.
//!
//! Logins for the same username are serialized so that the
//! invalidate-then-create sequence of two concurrent logins cannot
//! interleave and leave two live session pairs. Different usernames never
//! contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key async locks.
///
/// Entries are created on first use and reclaimed when the last guard for
/// a key is dropped, so the map does not grow with the set of usernames
/// ever seen.
#[derive(Debug, Default)]
pub struct LoginLockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LoginLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `key`, waiting if another task holds it.
    pub async fn acquire(&self, key: &str) -> LoginLockGuard<'_> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.lock_owned().await;

        LoginLockGuard {
            registry: self,
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys currently tracked. Exposed for tests and metrics.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds the lock for one key; releasing it may reclaim the map entry.
pub struct LoginLockGuard<'a> {
    registry: &'a LoginLockRegistry,
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for LoginLockGuard<'_> {
    fn drop(&mut self) {
        // Uncontended: the map holds one Arc and this guard holds one.
        // A waiter mid-acquire holds a third clone, which keeps the entry
        // alive. The shard lock taken by remove_if serializes this check
        // with concurrent `entry()` clones.
        self.registry
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_reclaimed_after_release() {
        let registry = LoginLockRegistry::new();
        {
            let _guard = registry.acquire("alice").await;
            assert_eq!(registry.len(), 1);
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_is_mutually_exclusive() {
        let registry = Arc::new(LoginLockRegistry::new());
        let in_section = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let in_section = Arc::clone(&in_section);
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("alice").await;
                let seen = in_section.fetch_add(1, Ordering::SeqCst);
                assert_eq!(seen, 0, "another task was inside the critical section");
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let registry = LoginLockRegistry::new();
        let _a = registry.acquire("alice").await;
        // Would deadlock if keys shared a lock.
        let _b = registry.acquire("bob").await;
        assert_eq!(registry.len(), 2);
    }
}
