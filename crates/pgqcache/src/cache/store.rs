//! The cache store abstraction and its Redis-backed implementation.
//!
//! Grounded on a sibling backend's `deadpool_redis`-pooled `ResultBackend`:
//! a thin `async_trait` over GET/SET-with-TTL/DEL/KEYS, a prefixed key
//! namespace, and a pool handed out per call rather than held across awaits.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as RedisPoolConfig, Connection, Pool as RedisPool, Runtime};
use redis::AsyncCommands;

use crate::error::{CacheDbError, CacheDbResult};

/// Redis connection settings (spec §10.3 `CacheConfig`).
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub url: String,
    pub key_prefix: String,
    pub pool_size: usize,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        RedisStoreConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "pgcache:".to_string(),
            pool_size: 16,
        }
    }
}

/// The read-through cache's storage backend. Implementors only need to get
/// the bytes in and out; TTL policy and fingerprinting live in
/// [`super::coordinator`].
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheDbResult<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheDbResult<()>;
    async fn del(&self, key: &str) -> CacheDbResult<()>;
    /// All keys matching a `redis`-style glob pattern.
    async fn keys(&self, pattern: &str) -> CacheDbResult<Vec<String>>;
}

/// A `deadpool-redis`-pooled [`CacheStore`].
#[derive(Clone)]
pub struct RedisCacheStore {
    pool: RedisPool,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn new(config: RedisStoreConfig) -> CacheDbResult<Self> {
        let pool = RedisPoolConfig::from_url(config.url)
            .builder()
            .map_err(|e| CacheDbError::Store(e.to_string()))?
            .max_size(config.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| CacheDbError::Store(e.to_string()))?;
        Ok(RedisCacheStore { pool, key_prefix: config.key_prefix })
    }

    async fn conn(&self) -> CacheDbResult<Connection> {
        self.pool.get().await.map_err(|e| CacheDbError::Store(e.to_string()))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheDbResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get(self.namespaced(key))
            .await
            .map_err(|e| CacheDbError::Store(e.to_string()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheDbResult<()> {
        let mut conn = self.conn().await?;
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(self.namespaced(key), value, secs)
            .await
            .map_err(|e| CacheDbError::Store(e.to_string()))
    }

    async fn del(&self, key: &str) -> CacheDbResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(self.namespaced(key))
            .await
            .map_err(|e| CacheDbError::Store(e.to_string()))
    }

    async fn keys(&self, pattern: &str) -> CacheDbResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let namespaced_pattern = self.namespaced(pattern);
        let prefix = self.key_prefix.clone();
        let keys: Vec<String> = conn
            .keys(namespaced_pattern)
            .await
            .map_err(|e| CacheDbError::Store(e.to_string()))?;
        Ok(keys
            .into_iter()
            .map(|k| k.strip_prefix(&prefix).map(str::to_string).unwrap_or(k))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercises a live Redis instance; not run in CI by default.
    #[tokio::test]
    #[ignore]
    async fn round_trips_a_value() {
        let store = RedisCacheStore::new(RedisStoreConfig::default()).unwrap();
        store.set_ex("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
