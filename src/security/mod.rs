pub mod cache;
pub mod content_filter;
pub mod link_extractor;
pub mod markup;
pub mod middleware;
pub mod moderation_config;
pub mod moderation_log;
pub mod rate_limiter;
pub mod url_validator;

pub use cache::CacheAccessor;
pub use content_filter::{ContentFilterPipeline, FilterVerdict};
pub use moderation_config::{LiveModerationConfig, ModerationConfig};
pub use moderation_log::{ModerationLogStore, RedisModerationLog};
pub use rate_limiter::RateLimiter;

use thiserror::Error;

/// Failures of the collaborators the moderation core talks to.
///
/// Verdict outcomes (empty content, bad links, profanity...) are never errors;
/// only infrastructure problems end up here, and callers must not treat them
/// as "content is clean".
#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Moderation log store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
