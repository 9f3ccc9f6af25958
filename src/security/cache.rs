use crate::redis_client::RedisClient;
use async_trait::async_trait;
use std::sync::Arc;

use super::ModerationError;

/// Key/value counter store with per-key TTL.
///
/// Absent keys read back as an empty string.
#[async_trait]
pub trait CacheAccessor: Send + Sync {
    async fn get_cache_value(&self, key: &str) -> Result<String, ModerationError>;

    async fn set_cache_value(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ModerationError>;

    /// Bump the integer counter under `key` unless it already reached `limit`.
    ///
    /// Returns `Some(new_count)` when the counter was advanced (and its TTL reset
    /// to `ttl_seconds`), `None` when the limit was hit; nothing is written then.
    /// A missing or non-numeric stored value counts as 0.
    ///
    /// This default is a plain read-modify-write and can lose updates when two
    /// callers race on the same key. Backends with server-side scripting
    /// should override it with an atomic version.
    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl_seconds: u64,
    ) -> Result<Option<i64>, ModerationError> {
        let current = self.get_cache_value(key).await?.trim().parse::<i64>().unwrap_or(0);
        if current >= limit {
            return Ok(None);
        }

        let next = current + 1;
        self.set_cache_value(key, &next.to_string(), ttl_seconds).await?;
        Ok(Some(next))
    }
}

#[async_trait]
impl<T: CacheAccessor + ?Sized> CacheAccessor for Arc<T> {
    async fn get_cache_value(&self, key: &str) -> Result<String, ModerationError> {
        (**self).get_cache_value(key).await
    }

    async fn set_cache_value(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ModerationError> {
        (**self).set_cache_value(key, value, ttl_seconds).await
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl_seconds: u64,
    ) -> Result<Option<i64>, ModerationError> {
        (**self).increment_below(key, limit, ttl_seconds).await
    }
}

#[async_trait]
impl CacheAccessor for RedisClient {
    async fn get_cache_value(&self, key: &str) -> Result<String, ModerationError> {
        self.get(key)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| ModerationError::Cache(format!("Failed to read {}: {}", key, e)))
    }

    async fn set_cache_value(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), ModerationError> {
        self.set_ex(key, value, ttl_seconds)
            .await
            .map_err(|e| ModerationError::Cache(format!("Failed to write {}: {}", key, e)))
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: i64,
        ttl_seconds: u64,
    ) -> Result<Option<i64>, ModerationError> {
        RedisClient::increment_below(self, key, limit, ttl_seconds)
            .await
            .map_err(|e| ModerationError::Cache(format!("Failed to increment {}: {}", key, e)))
    }
}
