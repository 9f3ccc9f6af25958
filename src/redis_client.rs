use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError, Script};

/// Atomic "increment unless at limit" for counters.
/// Returns the new count, or -1 when the counter already sits at the limit
/// (in which case nothing is written and the TTL is left alone).
/// Only a plain integer counts; anything else (`10.0`, `1e1`, `0xA`) reads as 0,
/// matching `str::parse::<i64>` on the trimmed value.
static INCREMENT_BELOW_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local raw = redis.call('GET', KEYS[1])
        local current = 0
        if raw and string.match(raw, '^%s*[+-]?%d+%s*$') then
            current = tonumber(raw)
        end
        if current >= tonumber(ARGV[1]) then
            return -1
        end
        current = current + 1
        redis.call('SET', KEYS[1], current, 'EX', ARGV[2])
        return current
        "#,
    )
});

/// Redis client wrapper for managing Redis connections and operations
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
}

impl RedisClient {
    /// Create a new Redis client from a connection URL
    ///
    /// Supports both plain (redis://) and encrypted (rediss://) connections.
    /// A URL without credentials is accepted with a warning.
    pub async fn new(redis_url: &str) -> Result<Self> {
        if !redis_url.contains("://") {
            return Err(anyhow::anyhow!(
                "Invalid Redis URL format. Expected: redis://:password@host:port or rediss://:password@host:port"
            ));
        }

        if !redis_url.contains('@') {
            tracing::warn!("Redis URL does not include a password; use redis://:password@host:port in production");
        }

        let client = Client::open(redis_url)
            .context("Failed to create Redis client from URL")?;

        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to create Redis connection manager - check REDIS_URL and password")?;

        Ok(Self { manager })
    }

    /// Set a key-value pair with an expiration time (in seconds)
    pub async fn set_ex(&self, key: &str, value: &str, seconds: u64) -> Result<(), RedisError> {
        let mut conn = self.manager.clone();
        conn.set_ex(key, value, seconds).await
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut conn = self.manager.clone();
        conn.get(key).await
    }

    /// Increment `key` by one unless it already holds `limit` or more.
    /// The new value is written with `seconds` of TTL.
    pub async fn increment_below(&self, key: &str, limit: i64, seconds: u64) -> Result<Option<i64>, RedisError> {
        let mut conn = self.manager.clone();
        let result: i64 = INCREMENT_BELOW_SCRIPT
            .key(key)
            .arg(limit)
            .arg(seconds)
            .invoke_async(&mut conn)
            .await?;
        Ok((result >= 0).then_some(result))
    }

    /// Add an element to a sorted set with a score
    pub async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), RedisError> {
        let mut conn = self.manager.clone();
        conn.zadd(key, member, score).await
    }

    /// Get the score of a sorted set member, if present
    pub async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, RedisError> {
        let mut conn = self.manager.clone();
        conn.zscore(key, member).await
    }

    /// Remove elements from a sorted set by score range
    pub async fn zrembyscore(&self, key: &str, min: f64, max: f64) -> Result<i64, RedisError> {
        let mut conn = self.manager.clone();
        conn.zrembyscore(key, min, max).await
    }

    /// Set expiration on a key
    pub async fn expire(&self, key: &str, seconds: i64) -> Result<bool, RedisError> {
        let mut conn = self.manager.clone();
        conn.expire(key, seconds).await
    }

    /// Add to a list (left push)
    pub async fn lpush(&self, key: &str, value: &str) -> Result<(), RedisError> {
        let mut conn = self.manager.clone();
        conn.lpush(key, value).await
    }

    /// Get a range from a list
    pub async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, RedisError> {
        let mut conn = self.manager.clone();
        conn.lrange(key, start, stop).await
    }

    /// Get every member of a set
    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, RedisError> {
        let mut conn = self.manager.clone();
        conn.smembers(key).await
    }

    /// Ping Redis to check if connection is alive
    pub async fn ping(&self) -> Result<bool, RedisError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|resp| resp == "PONG")
    }
}
