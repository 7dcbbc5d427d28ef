//! Redis cache and advisory lock adapters.
//!
//! Both surfaces share one key-value store and a service-wide key prefix.
//! The lock is advisory and TTL-bounded: a crashed holder is fenced by
//! expiry, so `release` is best-effort.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix applied to every cache and lock key.
const KEY_PREFIX: &str = "hotel-gateway:";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn prefixed(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

/// JSON-over-Redis cache with per-entry TTLs.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        let mut conn = manager.clone();
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        info!("redis cache connection established");

        Ok(Self { manager })
    }

    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }

    /// Fetch and deserialize a cached value; `None` on miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(prefixed(key)).await?;
        match value {
            Some(json) => {
                debug!(key, "cache hit");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                debug!(key, "cache miss");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(prefixed(key), json, ttl.as_secs()).await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<u64, CacheError> {
        let mut conn = self.manager.clone();
        Ok(conn.del(prefixed(key)).await?)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.manager.clone();
        Ok(conn.exists(prefixed(key)).await?)
    }

    /// Increment a counter, attaching a TTL when the key is created.
    pub async fn incr(&self, key: &str, ttl: Option<Duration>) -> Result<i64, CacheError> {
        let mut conn = self.manager.clone();
        let key = prefixed(key);
        let value: i64 = conn.incr(&key, 1).await?;
        if value == 1 {
            if let Some(ttl) = ttl {
                let _: bool = conn.expire(&key, ttl.as_secs() as i64).await?;
            }
        }
        Ok(value)
    }

    pub async fn mget<T: DeserializeOwned>(
        &self,
        keys: &[String],
    ) -> Result<Vec<Option<T>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        let full: Vec<String> = keys.iter().map(|k| prefixed(k)).collect();
        let values: Vec<Option<String>> = conn.mget(&full).await?;
        values
            .into_iter()
            .map(|v| v.map(|json| serde_json::from_str(&json)).transpose())
            .collect::<Result<Vec<_>, _>>()
            .map_err(CacheError::from)
    }

    pub async fn mset<T: Serialize>(
        &self,
        entries: &[(String, T)],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        for (key, value) in entries {
            let json = serde_json::to_string(value)?;
            conn.set_ex::<_, _, ()>(prefixed(key), json, ttl.as_secs()).await?;
        }
        Ok(())
    }

    /// Delete every key matching `pattern` (prefix applied).
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.manager.clone();
        let keys: Vec<String> = conn.keys(prefixed(pattern)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        let count: u64 = conn.del(&keys).await?;
        info!(pattern, deleted = count, "cache keys deleted by pattern");
        Ok(count)
    }
}

/// TTL-bounded advisory lock on the shared key-value store.
#[derive(Clone)]
pub struct RedisLock {
    manager: ConnectionManager,
}

impl RedisLock {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Set-if-absent with expiry. `false` means another owner holds it.
    pub async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut conn = self.manager.clone();
        let token = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let acquired: Option<String> = redis::cmd("SET")
            .arg(prefixed(key))
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(acquired.is_some())
    }

    /// Best-effort release; expiry covers the failure path.
    pub async fn release(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: u64 = conn.del(prefixed(key)).await?;
        Ok(())
    }
}
