//! In-memory cache implementation using the moka crate.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use readhub_core::config::cache::MemoryCacheConfig;
use readhub_core::result::AppResult;
use readhub_core::traits::cache::CacheProvider;

/// In-memory cache provider using moka for key/value entries and a
/// dashmap for set entries.
///
/// Moka applies a cache-level TTL rather than per-entry TTLs; that is
/// acceptable here because session freshness is always re-checked against
/// the session's own expiry on read.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, String>,
    /// Set entries, keyed like ordinary cache keys.
    sets: Arc<dashmap::DashMap<String, HashSet<String>>>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();

        Self {
            cache,
            sets: Arc::new(dashmap::DashMap::new()),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await)
    }

    async fn set(&self, key: &str, value: &str, _ttl: Duration) -> AppResult<()> {
        self.cache.insert(key.to_string(), value.to_string()).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        self.sets.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key) || self.sets.contains_key(key))
    }

    async fn set_add(&self, key: &str, members: &[String]) -> AppResult<()> {
        let mut entry = self.sets.entry(key.to_string()).or_default();
        for member in members {
            entry.insert(member.clone());
        }
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        if let Some(mut entry) = self.sets.get_mut(key) {
            entry.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        Ok(self
            .sets
            .get(key)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.cache.invalidate_all();
        self.sets.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_provider() -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig {
            max_capacity: 1000,
            time_to_live_seconds: 60,
        })
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let provider = make_provider();
        provider
            .set("key1", "value1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            provider.get("key1").await.unwrap(),
            Some("value1".to_string())
        );

        provider.delete("key1").await.unwrap();
        assert_eq!(provider.get("key1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_operations() {
        let provider = make_provider();
        provider
            .set_add("idx", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        let mut members = provider.set_members("idx").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a".to_string(), "b".to_string()]);

        provider.set_remove("idx", "a").await.unwrap();
        assert_eq!(provider.set_members("idx").await.unwrap(), vec!["b"]);

        // Deleting the key removes the whole set.
        provider.delete("idx").await.unwrap();
        assert!(provider.set_members("idx").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_set_is_empty() {
        let provider = make_provider();
        assert!(provider.set_members("nope").await.unwrap().is_empty());
        provider.set_remove("nope", "x").await.unwrap();
    }
}
