use crate::redis_client::RedisClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::content_filter::FilterVerdict;
use super::ModerationError;

const LOG_KEY: &str = "moderation:log";
const RECENT_KEY_PREFIX: &str = "moderation:recent:";

/// Audit record for a submission that was blocked or sent to review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationLogEntry {
    pub id: Uuid,
    pub user_id: i64,
    pub original_content: String,
    pub sanitized_content: String,
    pub is_blocked: bool,
    pub requires_moderation: bool,
    /// JSON array of the verdict warnings, in check order
    pub warnings: String,
    pub created_at: DateTime<Utc>,
}

impl ModerationLogEntry {
    pub fn from_verdict(
        user_id: i64,
        original_content: &str,
        verdict: &FilterVerdict,
    ) -> Result<Self, ModerationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            original_content: original_content.to_string(),
            sanitized_content: verdict.sanitized_content.clone(),
            is_blocked: verdict.is_blocked,
            requires_moderation: verdict.requires_moderation,
            warnings: serde_json::to_string(&verdict.warnings)?,
            created_at: Utc::now(),
        })
    }

    /// Decode the serialized warning list
    #[cfg(test)]
    pub fn warning_list(&self) -> Result<Vec<String>, ModerationError> {
        Ok(serde_json::from_str(&self.warnings)?)
    }
}

/// Append-only persistence for flagged submissions.
#[async_trait]
pub trait ModerationLogStore: Send + Sync {
    /// Whether `user_id` submitted equivalent content within the trailing `window`.
    /// What counts as equivalent is up to the store.
    async fn has_duplicate_content(
        &self,
        user_id: i64,
        content: &str,
        window: Duration,
    ) -> Result<bool, ModerationError>;

    async fn add(&self, entry: ModerationLogEntry) -> Result<(), ModerationError>;

    /// Newest entries first
    async fn recent_entries(&self, limit: usize) -> Result<Vec<ModerationLogEntry>, ModerationError>;
}

#[async_trait]
impl<T: ModerationLogStore + ?Sized> ModerationLogStore for Arc<T> {
    async fn has_duplicate_content(
        &self,
        user_id: i64,
        content: &str,
        window: Duration,
    ) -> Result<bool, ModerationError> {
        (**self).has_duplicate_content(user_id, content, window).await
    }

    async fn add(&self, entry: ModerationLogEntry) -> Result<(), ModerationError> {
        (**self).add(entry).await
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<ModerationLogEntry>, ModerationError> {
        (**self).recent_entries(limit).await
    }
}

/// Hash of the content with case and whitespace differences folded away.
pub fn content_fingerprint(content: &str) -> String {
    let normalized = content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Redis-backed moderation log.
///
/// Entries are pushed as JSON onto `moderation:log`. Each user also gets a
/// sorted set of content fingerprints scored by submission time, which is what
/// the duplicate check reads.
#[derive(Clone)]
pub struct RedisModerationLog {
    redis: RedisClient,
    retention: Duration,
}

impl RedisModerationLog {
    pub fn new(redis: RedisClient, retention: Duration) -> Self {
        Self { redis, retention }
    }

    fn recent_key(user_id: i64) -> String {
        format!("{}{}", RECENT_KEY_PREFIX, user_id)
    }
}

#[async_trait]
impl ModerationLogStore for RedisModerationLog {
    async fn has_duplicate_content(
        &self,
        user_id: i64,
        content: &str,
        window: Duration,
    ) -> Result<bool, ModerationError> {
        let key = Self::recent_key(user_id);
        let score = self
            .redis
            .zscore(&key, &content_fingerprint(content))
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to look up recent content: {}", e)))?;

        let window_start = Utc::now().timestamp() as f64 - window.as_secs_f64();
        Ok(score.is_some_and(|submitted_at| submitted_at >= window_start))
    }

    async fn add(&self, entry: ModerationLogEntry) -> Result<(), ModerationError> {
        let entry_json = serde_json::to_string(&entry)?;

        self.redis
            .lpush(LOG_KEY, &entry_json)
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to append moderation log: {}", e)))?;

        let key = Self::recent_key(entry.user_id);
        let submitted_at = entry.created_at.timestamp() as f64;
        self.redis
            .zadd(&key, submitted_at, &content_fingerprint(&entry.original_content))
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to record content fingerprint: {}", e)))?;

        // Drop fingerprints that fell out of the retention window
        let cutoff = submitted_at - self.retention.as_secs_f64();
        self.redis
            .zrembyscore(&key, 0.0, cutoff)
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to prune content fingerprints: {}", e)))?;

        self.redis
            .expire(&key, self.retention.as_secs() as i64 + 60)
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to set expiration on fingerprints: {}", e)))?;

        Ok(())
    }

    async fn recent_entries(&self, limit: usize) -> Result<Vec<ModerationLogEntry>, ModerationError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let raw = self
            .redis
            .lrange(LOG_KEY, 0, limit as isize - 1)
            .await
            .map_err(|e| ModerationError::Store(format!("Failed to read moderation log: {}", e)))?;

        let mut entries = Vec::with_capacity(raw.len());
        for json in raw {
            match serde_json::from_str::<ModerationLogEntry>(&json) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable moderation log entry: {}", e),
            }
        }
        Ok(entries)
    }
}
