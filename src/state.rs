use crate::config::AppConfig;
use crate::monitoring::MetricsTracker;
use crate::redis_client::RedisClient;
use crate::security::{
    content_filter::DUPLICATE_WINDOW,
    middleware::ModeratorAllowList,
    ContentFilterPipeline,
    LiveModerationConfig,
    RateLimiter,
    RedisModerationLog,
};
use anyhow::Result;
use std::sync::Arc;

pub type Pipeline = ContentFilterPipeline<RedisModerationLog, LiveModerationConfig>;

#[derive(Clone)]
pub struct AppState {
    pub redis: RedisClient,
    pub rate_limiter: RateLimiter<RedisClient>,
    pub pipeline: Arc<Pipeline>,
    pub moderation_config: LiveModerationConfig,
    pub metrics: MetricsTracker,
    pub moderators: ModeratorAllowList,
}

impl AppState {
    /// Connect to Redis and wire the moderation core together
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let redis = RedisClient::new(&config.redis_url).await?;
        let rate_limiter = RateLimiter::new(redis.clone());
        let moderation_config = LiveModerationConfig::new(config.moderation.clone());
        let log_store = RedisModerationLog::new(redis.clone(), DUPLICATE_WINDOW);
        let pipeline = Arc::new(ContentFilterPipeline::new(log_store, moderation_config.clone()));
        let metrics = MetricsTracker::install()?;

        if config.moderators.is_empty() {
            tracing::warn!("MODERATOR_USER_IDS is empty; the review queue is closed to everyone");
        }

        Ok(Self {
            redis,
            rate_limiter,
            pipeline,
            moderation_config,
            metrics,
            moderators: config.moderators.clone(),
        })
    }
}
