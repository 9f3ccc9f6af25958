use super::{CacheAccessor, ModerationError};
use serde::Serialize;

/// Limits applied to content submissions.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum accepted submissions inside one window
    pub max_requests: i64,
    /// Window length; refreshed on every accepted request
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    /// 10 submissions per rolling 60 seconds
    pub const CONTENT_SUBMISSION: Self = Self {
        max_requests: 10,
        window_seconds: 60,
    };
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::CONTENT_SUBMISSION
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub remaining: i64,
    pub limit: i64,
    pub window_seconds: u64,
}

/// Per-user rolling-window rate limiter on top of a shared cache.
///
/// The counter lives under `ratelimit:{user_id}`; its TTL is the window, and
/// every accepted request pushes the expiry out again.
#[derive(Clone)]
pub struct RateLimiter<C: CacheAccessor> {
    cache: C,
    policy: RateLimitPolicy,
}

impl<C: CacheAccessor> RateLimiter<C> {
    pub fn new(cache: C) -> Self {
        Self::with_policy(cache, RateLimitPolicy::default())
    }

    pub fn with_policy(cache: C, policy: RateLimitPolicy) -> Self {
        Self { cache, policy }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    fn key(user_id: i64) -> String {
        format!("ratelimit:{}", user_id)
    }

    /// Admit or reject one submission attempt for `user_id`.
    ///
    /// Accepted attempts advance the counter and refresh its TTL; rejected
    /// attempts leave the stored value and its expiry untouched.
    pub async fn check_rate_limit(&self, user_id: i64) -> Result<bool, ModerationError> {
        let key = Self::key(user_id);

        let admitted = self
            .cache
            .increment_below(&key, self.policy.max_requests, self.policy.window_seconds)
            .await?;

        match admitted {
            Some(count) => {
                tracing::debug!(user_id, count, "Submission admitted by rate limiter");
                Ok(true)
            }
            None => {
                tracing::info!(user_id, limit = self.policy.max_requests, "Submission rejected by rate limiter");
                Ok(false)
            }
        }
    }

    /// Check the current rate limit status without consuming a request
    pub async fn rate_limit_status(&self, user_id: i64) -> Result<RateLimitStatus, ModerationError> {
        let current = self
            .cache
            .get_cache_value(&Self::key(user_id))
            .await?
            .trim()
            .parse::<i64>()
            .unwrap_or(0)
            .max(0);

        let remaining = (self.policy.max_requests - current).max(0);

        Ok(RateLimitStatus {
            allowed: remaining > 0,
            remaining,
            limit: self.policy.max_requests,
            window_seconds: self.policy.window_seconds,
        })
    }
}
