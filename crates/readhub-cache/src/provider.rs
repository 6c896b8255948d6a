//! Cache manager that dispatches to the configured provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::info;

use readhub_core::config::cache::CacheConfig;
use readhub_core::error::AppError;
use readhub_core::result::AppResult;
use readhub_core::traits::cache::CacheProvider;

/// Cache manager that wraps the configured cache provider.
///
/// The provider is selected at construction time based on configuration.
/// Every operation is bounded by the configured per-operation timeout so
/// a stalled cache backend cannot hang a request indefinitely.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider.
    inner: Arc<dyn CacheProvider>,
    /// Upper bound for a single cache round trip.
    op_timeout: Duration,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCacheProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory cache provider");
                Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self {
            inner,
            op_timeout: Duration::from_millis(config.op_timeout_ms),
        })
    }

    /// Create a cache manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn CacheProvider>) -> Self {
        Self {
            inner: provider,
            op_timeout: Duration::from_secs(2),
        }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn CacheProvider {
        self.inner.as_ref()
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = AppResult<T>> + Send,
    ) -> AppResult<T> {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::cache(format!("cache {op} timed out"))),
        }
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.bounded("set", self.inner.set(key, value, ttl)).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.bounded("delete", self.inner.delete(key)).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.bounded("exists", self.inner.exists(key)).await
    }

    async fn set_add(&self, key: &str, members: &[String]) -> AppResult<()> {
        self.bounded("set_add", self.inner.set_add(key, members))
            .await
    }

    async fn set_remove(&self, key: &str, member: &str) -> AppResult<()> {
        self.bounded("set_remove", self.inner.set_remove(key, member))
            .await
    }

    async fn set_members(&self, key: &str) -> AppResult<Vec<String>> {
        self.bounded("set_members", self.inner.set_members(key))
            .await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.bounded("health_check", self.inner.health_check())
            .await
    }

    async fn flush_all(&self) -> AppResult<()> {
        self.bounded("flush_all", self.inner.flush_all()).await
    }
}
