use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::security::{middleware::ModeratorAllowList, ModerationConfig};

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_REFRESH_SECS: u64 = 30;

/// Process configuration, read from the environment (and `.env`)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub redis_url: String,
    pub bind_addr: SocketAddr,
    pub config_refresh_interval: Duration,
    /// Users who may read the moderation review queue
    pub moderators: ModeratorAllowList,
    /// Seed for the live moderation settings until Redis overrides arrive
    pub moderation: ModerationConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults,
    /// set-but-unparsable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:3001")?;

        let refresh_secs = match lookup("MODERATION_CONFIG_REFRESH_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("MODERATION_CONFIG_REFRESH_SECS must be a whole number of seconds")?,
            None => DEFAULT_REFRESH_SECS,
        };
        if refresh_secs == 0 {
            anyhow::bail!("MODERATION_CONFIG_REFRESH_SECS must be greater than zero");
        }

        let profanity_enabled = match lookup("PROFANITY_FILTER_ENABLED") {
            Some(raw) => raw
                .trim()
                .parse::<bool>()
                .context("PROFANITY_FILTER_ENABLED must be true or false")?,
            None => true,
        };

        let profanity_words = split_list(lookup("PROFANITY_WORDS"));
        let trusted_domains = split_list(lookup("TRUSTED_DOMAINS"));

        let moderator_ids = split_list(lookup("MODERATOR_USER_IDS"))
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<i64>()
                    .with_context(|| format!("MODERATOR_USER_IDS entry '{}' is not a user id", id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            redis_url,
            bind_addr,
            config_refresh_interval: Duration::from_secs(refresh_secs),
            moderators: ModeratorAllowList::new(moderator_ids),
            moderation: ModerationConfig::new(profanity_enabled, profanity_words, trusted_domains),
        })
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| value.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::middleware::UserContext;
    use std::collections::{HashMap, HashSet};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.bind_addr, "0.0.0.0:3001".parse::<SocketAddr>().unwrap());
        assert_eq!(config.config_refresh_interval, Duration::from_secs(30));
        assert!(config.moderation.profanity_filter_enabled);
        assert!(config.moderation.profanity_words.is_empty());
        assert!(config.moderation.trusted_domains.is_empty());
        assert!(config.moderators.is_empty());
    }

    #[test]
    fn test_lists_are_split_and_normalized() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("PROFANITY_WORDS", "BadWord, other ,,"),
            ("TRUSTED_DOMAINS", "stellar.org, .Example.com"),
            ("PROFANITY_FILTER_ENABLED", "false"),
        ]))
        .unwrap();

        assert!(!config.moderation.profanity_filter_enabled);
        assert_eq!(
            config.moderation.profanity_words,
            HashSet::from(["badword".to_string(), "other".to_string()])
        );
        assert_eq!(
            config.moderation.trusted_domains,
            HashSet::from(["stellar.org".to_string(), "example.com".to_string()])
        );
    }

    #[test]
    fn test_moderator_ids_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[("MODERATOR_USER_IDS", " 7, 12 ,,")])).unwrap();

        assert!(config.moderators.permits(&UserContext { user_id: 7 }));
        assert!(config.moderators.permits(&UserContext { user_id: 12 }));
        assert!(!config.moderators.permits(&UserContext { user_id: 8 }));
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(AppConfig::from_lookup(lookup_from(&[("MODERATOR_USER_IDS", "7,admin")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("PROFANITY_FILTER_ENABLED", "maybe")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MODERATION_CONFIG_REFRESH_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MODERATION_CONFIG_REFRESH_SECS", "soon")])).is_err());
    }
}
