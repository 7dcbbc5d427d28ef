//! Cache and lock seams used by the job pipeline.
//!
//! Thin traits over the shared Redis adapters so handlers can be
//! exercised against in-memory doubles.

use async_trait::async_trait;
use hotel_gateway_core::{CacheError, RedisCache, RedisLock};
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait CachePort: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, CacheError>;
    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError>;
}

#[async_trait]
pub trait LockPort: Send + Sync {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;
    async fn release(&self, key: &str) -> Result<(), CacheError>;
}

#[async_trait]
impl CachePort for RedisCache {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, CacheError> {
        self.get(key).await
    }

    async fn set_json(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        self.set(key, value, ttl).await
    }
}

#[async_trait]
impl LockPort for RedisLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        RedisLock::acquire(self, key, ttl).await
    }

    async fn release(&self, key: &str) -> Result<(), CacheError> {
        RedisLock::release(self, key).await
    }
}
