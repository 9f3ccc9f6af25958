use crate::redis_client::RedisClient;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const PROFANITY_ENABLED_KEY: &str = "moderation:config:profanity_enabled";
const PROFANITY_WORDS_KEY: &str = "moderation:config:profanity_words";
const TRUSTED_DOMAINS_KEY: &str = "moderation:config:trusted_domains";

/// Moderation settings as seen by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationConfig {
    pub profanity_filter_enabled: bool,
    /// Lower-cased, never contains empty entries
    pub profanity_words: HashSet<String>,
    /// Lower-cased registrable domains, without leading or trailing dots
    pub trusted_domains: HashSet<String>,
}

impl ModerationConfig {
    pub fn new<W, D>(profanity_filter_enabled: bool, profanity_words: W, trusted_domains: D) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Self {
            profanity_filter_enabled,
            profanity_words: normalize_words(profanity_words),
            trusted_domains: normalize_domains(trusted_domains),
        }
    }
}

fn normalize_words<I>(words: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn normalize_domains<I>(domains: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    domains
        .into_iter()
        .map(|d| d.as_ref().trim().trim_matches('.').to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Read-only source of the current moderation settings.
#[async_trait]
pub trait ModerationConfigProvider: Send + Sync {
    async fn current(&self) -> ModerationConfig;
}

/// A fixed configuration is its own provider.
#[async_trait]
impl ModerationConfigProvider for ModerationConfig {
    async fn current(&self) -> ModerationConfig {
        self.clone()
    }
}

#[async_trait]
impl<T: ModerationConfigProvider + ?Sized> ModerationConfigProvider for Arc<T> {
    async fn current(&self) -> ModerationConfig {
        (**self).current().await
    }
}

/// Shared snapshot that a background task keeps in sync with Redis.
#[derive(Clone)]
pub struct LiveModerationConfig {
    snapshot: Arc<RwLock<ModerationConfig>>,
}

impl LiveModerationConfig {
    pub fn new(initial: ModerationConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn replace(&self, config: ModerationConfig) {
        *self.snapshot.write().await = config;
    }

    /// Pull overrides from Redis and swap them in.
    ///
    /// Keys that are absent keep their current value, so an empty Redis leaves
    /// the environment defaults in place.
    pub async fn refresh_from(&self, redis: &RedisClient) -> Result<(), redis::RedisError> {
        let enabled = redis.get(PROFANITY_ENABLED_KEY).await?;
        let words = redis.smembers(PROFANITY_WORDS_KEY).await?;
        let domains = redis.smembers(TRUSTED_DOMAINS_KEY).await?;

        let mut next = self.current().await;
        if let Some(flag) = enabled {
            match flag.trim().parse::<bool>() {
                Ok(flag) => next.profanity_filter_enabled = flag,
                Err(_) => tracing::warn!(value = %flag, "Ignoring unparsable {}", PROFANITY_ENABLED_KEY),
            }
        }
        if !words.is_empty() {
            next.profanity_words = normalize_words(words);
        }
        if !domains.is_empty() {
            next.trusted_domains = normalize_domains(domains);
        }

        self.replace(next).await;
        Ok(())
    }

    /// Spawn the periodic refresh loop. Failures keep the previous snapshot.
    pub fn spawn_refresh(&self, redis: RedisClient, every: Duration) -> tokio::task::JoinHandle<()> {
        let live = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match live.refresh_from(&redis).await {
                    Ok(()) => {
                        let config = live.current().await;
                        tracing::debug!(
                            profanity_enabled = config.profanity_filter_enabled,
                            profanity_words = config.profanity_words.len(),
                            trusted_domains = config.trusted_domains.len(),
                            "Moderation config refreshed"
                        );
                    }
                    Err(e) => tracing::warn!("Failed to refresh moderation config, keeping previous: {}", e),
                }
            }
        })
    }
}

#[async_trait]
impl ModerationConfigProvider for LiveModerationConfig {
    async fn current(&self) -> ModerationConfig {
        self.snapshot.read().await.clone()
    }
}
