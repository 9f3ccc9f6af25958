use serde::Serialize;
use std::time::Duration;

use super::link_extractor::extract_links;
use super::markup::render_and_sanitize;
use super::moderation_config::{ModerationConfig, ModerationConfigProvider};
use super::moderation_log::{ModerationLogEntry, ModerationLogStore};
use super::url_validator::validate_link;
use super::ModerationError;

pub const EMPTY_CONTENT_WARNING: &str = "Content cannot be empty";

/// How far back the duplicate check looks
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// More inline links than this blocks the submission
pub const MAX_LINKS: usize = 5;

/// Result of a single moderation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Clean,
    /// Publishable, but queue for human review
    Moderate(String),
    /// Must not be stored or published
    Block(String),
}

/// Aggregated decision for one submission.
///
/// `warnings` is non-empty exactly when the submission is blocked or needs
/// moderation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterVerdict {
    pub sanitized_content: String,
    pub is_blocked: bool,
    pub requires_moderation: bool,
    pub warnings: Vec<String>,
}

impl FilterVerdict {
    pub fn empty_content() -> Self {
        Self {
            is_blocked: true,
            warnings: vec![EMPTY_CONTENT_WARNING.to_string()],
            ..Self::default()
        }
    }

    /// Fold one rule outcome into the verdict
    pub fn record(&mut self, outcome: CheckOutcome) {
        match outcome {
            CheckOutcome::Clean => {}
            CheckOutcome::Moderate(reason) => {
                self.requires_moderation = true;
                self.warnings.push(reason);
            }
            CheckOutcome::Block(reason) => {
                self.is_blocked = true;
                self.warnings.push(reason);
            }
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.is_blocked || self.requires_moderation
    }
}

/// Moderation pipeline for user submitted markdown.
///
/// Checks run in a fixed order and all of them run for non-empty content, so
/// independent problems show up together in one verdict. Only the empty check
/// short-circuits.
pub struct ContentFilterPipeline<L, P> {
    log_store: L,
    config: P,
}

impl<L, P> ContentFilterPipeline<L, P>
where
    L: ModerationLogStore,
    P: ModerationConfigProvider,
{
    pub fn new(log_store: L, config: P) -> Self {
        Self { log_store, config }
    }

    pub fn log_store(&self) -> &L {
        &self.log_store
    }

    /// Run every check on `content` and persist the verdict when flagged.
    ///
    /// Errors only come from the log store; they are returned rather than
    /// treated as a clean verdict.
    pub async fn filter_content(&self, content: &str, user_id: i64) -> Result<FilterVerdict, ModerationError> {
        if content.trim().is_empty() {
            let verdict = FilterVerdict::empty_content();
            self.log_verdict(user_id, content, &verdict).await?;
            return Ok(verdict);
        }

        let config = self.config.current().await;
        let mut verdict = FilterVerdict::default();

        verdict.record(self.check_duplicate(content, user_id).await?);

        verdict.sanitized_content = render_and_sanitize(content);

        verdict.record(check_profanity(content, &config));

        for outcome in check_links(content, &config) {
            verdict.record(outcome);
        }

        if verdict.is_flagged() {
            self.log_verdict(user_id, content, &verdict).await?;
        } else {
            tracing::debug!(user_id, "Content passed moderation");
        }

        Ok(verdict)
    }

    async fn check_duplicate(&self, content: &str, user_id: i64) -> Result<CheckOutcome, ModerationError> {
        let duplicate = self
            .log_store
            .has_duplicate_content(user_id, content, DUPLICATE_WINDOW)
            .await?;

        Ok(if duplicate {
            CheckOutcome::Block("Duplicate content detected. Please wait before posting the same content again".to_string())
        } else {
            CheckOutcome::Clean
        })
    }

    async fn log_verdict(&self, user_id: i64, content: &str, verdict: &FilterVerdict) -> Result<(), ModerationError> {
        let entry = ModerationLogEntry::from_verdict(user_id, content, verdict)?;
        tracing::info!(
            user_id,
            entry_id = %entry.id,
            blocked = verdict.is_blocked,
            requires_moderation = verdict.requires_moderation,
            warnings = verdict.warnings.len(),
            "Content flagged by moderation"
        );
        self.log_store.add(entry).await
    }
}

/// Case-insensitive substring match against the configured word list
pub fn check_profanity(content: &str, config: &ModerationConfig) -> CheckOutcome {
    if !config.profanity_filter_enabled || config.profanity_words.is_empty() {
        return CheckOutcome::Clean;
    }

    let lowercase = content.to_lowercase();
    if config.profanity_words.iter().any(|word| lowercase.contains(word.as_str())) {
        CheckOutcome::Moderate("Profanity detected in content".to_string())
    } else {
        CheckOutcome::Clean
    }
}

/// Link-flood check followed by one validation outcome per extracted link
pub fn check_links(content: &str, config: &ModerationConfig) -> Vec<CheckOutcome> {
    let links = extract_links(content);
    let mut outcomes = Vec::with_capacity(links.len() + 1);

    if links.len() > MAX_LINKS {
        outcomes.push(CheckOutcome::Block(format!(
            "Too many links ({} found, max {} allowed)",
            links.len(),
            MAX_LINKS
        )));
    }

    outcomes.extend(links.iter().map(|link| validate_link(&link.url, &config.trusted_domains)));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::moderation_log::fake::InMemoryModerationLog;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    type TestPipeline = ContentFilterPipeline<Arc<InMemoryModerationLog>, ModerationConfig>;

    fn pipeline(config: ModerationConfig) -> (Arc<InMemoryModerationLog>, TestPipeline) {
        let store = Arc::new(InMemoryModerationLog::new());
        (store.clone(), ContentFilterPipeline::new(store, config))
    }

    fn no_rules() -> ModerationConfig {
        ModerationConfig::default()
    }

    fn assert_invariant(verdict: &FilterVerdict) {
        assert_eq!(
            !verdict.warnings.is_empty(),
            verdict.is_blocked || verdict.requires_moderation,
            "warnings must be present exactly when flagged: {:?}",
            verdict
        );
    }

    #[tokio::test]
    async fn test_empty_content_is_blocked_and_logged_once() {
        let (store, pipeline) = pipeline(no_rules());

        let verdict = pipeline.filter_content("", 1).await.unwrap();

        assert!(verdict.is_blocked);
        assert!(!verdict.requires_moderation);
        assert_eq!(verdict.warnings, vec!["Content cannot be empty".to_string()]);
        assert_eq!(verdict.sanitized_content, "");

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].user_id, 1);
        assert!(entries[0].is_blocked);
    }

    #[tokio::test]
    async fn test_whitespace_only_skips_every_other_check() {
        let config = ModerationConfig::new(true, [" "], ["stellar.org"]);
        let (store, pipeline) = pipeline(config);
        // A duplicate answer must not leak into the empty verdict
        store.report_duplicates_for(4);

        let verdict = pipeline.filter_content("  \n\t ", 4).await.unwrap();

        assert_eq!(verdict, FilterVerdict::empty_content());
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_content_survives_failing_lookup() {
        let (store, pipeline) = pipeline(no_rules());
        store.fail_lookups.store(true, Ordering::SeqCst);

        let verdict = pipeline.filter_content("   ", 1).await.unwrap();
        assert!(verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_clean_content_is_rendered_and_not_logged() {
        let (store, pipeline) = pipeline(ModerationConfig::new(true, ["badword"], ["example.com"]));

        let verdict = pipeline
            .filter_content("Hello **world**, see [docs](https://docs.example.com)", 1)
            .await
            .unwrap();

        assert!(!verdict.is_blocked);
        assert!(!verdict.requires_moderation);
        assert!(verdict.warnings.is_empty());
        assert!(verdict.sanitized_content.contains("<strong>world</strong>"));
        assert!(verdict.sanitized_content.contains(r#"href="https://docs.example.com""#));
        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_profanity_is_case_insensitive_and_moderates() {
        let (store, pipeline) = pipeline(ModerationConfig::new(true, ["badword"], Vec::<String>::new()));

        let verdict = pipeline.filter_content("This contains BADWORD", 1).await.unwrap();

        assert!(verdict.requires_moderation);
        assert!(!verdict.is_blocked);
        assert!(verdict.warnings.iter().any(|w| w.contains("Profanity detected")));
        assert_eq!(store.entries().len(), 1);
        assert_invariant(&verdict);
    }

    #[tokio::test]
    async fn test_profanity_disabled_or_empty_list_is_noop() {
        let (_, disabled) = pipeline(ModerationConfig::new(false, ["badword"], Vec::<String>::new()));
        let verdict = disabled.filter_content("badword", 1).await.unwrap();
        assert!(verdict.warnings.is_empty());

        let (_, no_words) = pipeline(ModerationConfig::new(true, Vec::<String>::new(), Vec::<String>::new()));
        let verdict = no_words.filter_content("badword", 1).await.unwrap();
        assert!(verdict.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_blocks_and_still_runs_other_checks() {
        let (store, pipeline) = pipeline(ModerationConfig::new(true, ["badword"], Vec::<String>::new()));
        store.report_duplicates_for(2);

        let verdict = pipeline.filter_content("badword again", 2).await.unwrap();

        assert!(verdict.is_blocked);
        assert!(verdict.requires_moderation);
        assert_eq!(verdict.warnings.len(), 2);
        assert!(verdict.warnings[0].contains("Duplicate content"));
        assert!(verdict.warnings[1].contains("Profanity detected"));
        assert!(!verdict.sanitized_content.is_empty());
        assert_eq!(store.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_answer_is_per_user() {
        let (store, pipeline) = pipeline(no_rules());
        store.report_duplicates_for(2);

        let verdict = pipeline.filter_content("same text", 3).await.unwrap();
        assert!(!verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_too_many_links_blocks() {
        let (_, pipeline) = pipeline(no_rules());
        let content: String = (0..10)
            .map(|i| format!("[link {}](https://example.com/{}) ", i, i))
            .collect();

        let verdict = pipeline.filter_content(&content, 1).await.unwrap();

        assert!(verdict.is_blocked);
        assert!(verdict.warnings.iter().any(|w| w.contains("Too many links")));
        assert_invariant(&verdict);
    }

    #[tokio::test]
    async fn test_five_links_is_within_limit() {
        let (_, pipeline) = pipeline(no_rules());
        let content: String = (0..5)
            .map(|i| format!("[link {}](https://example.com/{}) ", i, i))
            .collect();

        let verdict = pipeline.filter_content(&content, 1).await.unwrap();
        assert!(!verdict.is_blocked);
    }

    #[tokio::test]
    async fn test_link_flood_is_independent_of_validity() {
        let (_, pipeline) = pipeline(no_rules());
        let content: String = (0..6).map(|i| format!("[bad {}](nope-{}) ", i, i)).collect();

        let verdict = pipeline.filter_content(&content, 1).await.unwrap();

        assert!(verdict.is_blocked);
        assert!(verdict.requires_moderation);
        assert_eq!(verdict.warnings.len(), 7);
        assert!(verdict.warnings[0].contains("Too many links"));
        assert!(verdict.warnings[1..].iter().all(|w| w.contains("Invalid URL")));
    }

    #[tokio::test]
    async fn test_trusted_subdomain_has_no_domain_warning() {
        let (_, pipeline) = pipeline(ModerationConfig::new(false, Vec::<String>::new(), ["stellar.org"]));

        let verdict = pipeline
            .filter_content("Read [the docs](https://docs.stellar.org)", 1)
            .await
            .unwrap();

        assert!(!verdict.requires_moderation);
        assert!(!verdict.warnings.iter().any(|w| w.contains("Untrusted domain")));
    }

    #[tokio::test]
    async fn test_link_title_does_not_affect_validation() {
        let (_, pipeline) = pipeline(ModerationConfig::new(false, Vec::<String>::new(), ["stellar.org"]));

        let verdict = pipeline
            .filter_content(r#"[t](https://stellar.org "Docs")"#, 1)
            .await
            .unwrap();

        assert!(verdict.warnings.is_empty());
        assert!(!verdict.requires_moderation);
        assert!(verdict.sanitized_content.contains(r#"href="https://stellar.org""#));
    }

    #[tokio::test]
    async fn test_each_bad_link_contributes_one_warning() {
        let (store, pipeline) = pipeline(ModerationConfig::new(false, Vec::<String>::new(), ["stellar.org"]));

        let verdict = pipeline
            .filter_content(
                "[a](javascript:alert(1)) [b](nope) [c](https://example.com) [d](https://stellar.org)",
                1,
            )
            .await
            .unwrap();

        assert!(verdict.is_blocked);
        assert!(verdict.requires_moderation);
        assert_eq!(verdict.warnings.len(), 3);
        assert!(verdict.warnings[0].contains("Non-HTTP(S) URL"));
        assert!(verdict.warnings[1].contains("Invalid URL"));
        assert!(verdict.warnings[2].contains("Untrusted domain"));

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].warning_list().unwrap(), verdict.warnings);
    }

    #[tokio::test]
    async fn test_empty_trusted_set_never_flags_domains() {
        let (_, pipeline) = pipeline(no_rules());

        let verdict = pipeline
            .filter_content("[x](https://whatever.example.net) [y](http://192.168.0.1/)", 1)
            .await
            .unwrap();

        assert!(verdict.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_sanitized_content_drops_scripts() {
        let (_, pipeline) = pipeline(no_rules());

        let verdict = pipeline
            .filter_content("Hi <script>alert('x')</script><div onclick=\"x()\">there</div>", 1)
            .await
            .unwrap();

        assert!(!verdict.sanitized_content.contains("script"));
        assert!(!verdict.sanitized_content.contains("alert"));
        assert!(!verdict.sanitized_content.contains("onclick"));
        assert!(verdict.sanitized_content.contains("Hi"));
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let (store, pipeline) = pipeline(no_rules());
        store.fail_lookups.store(true, Ordering::SeqCst);

        let result = pipeline.filter_content("hello", 1).await;
        assert!(matches!(result, Err(ModerationError::Store(_))));
    }

    #[tokio::test]
    async fn test_log_write_failure_propagates() {
        let (store, pipeline) = pipeline(ModerationConfig::new(true, ["badword"], Vec::<String>::new()));
        store.fail_writes.store(true, Ordering::SeqCst);

        let result = pipeline.filter_content("badword", 1).await;
        assert!(matches!(result, Err(ModerationError::Store(_))));

        // Clean content never touches the write path
        assert!(pipeline.filter_content("fine", 1).await.is_ok());
    }

    #[test]
    fn test_record_folds_outcomes() {
        let mut verdict = FilterVerdict::default();
        verdict.record(CheckOutcome::Clean);
        assert!(!verdict.is_flagged());

        verdict.record(CheckOutcome::Moderate("m".to_string()));
        verdict.record(CheckOutcome::Block("b".to_string()));

        assert!(verdict.is_blocked);
        assert!(verdict.requires_moderation);
        assert_eq!(verdict.warnings, vec!["m".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_check_links_flood_comes_first() {
        let content: String = (0..6).map(|i| format!("[l](https://e.com/{}) ", i)).collect();
        let outcomes = check_links(&content, &no_rules());

        assert_eq!(outcomes.len(), 7);
        assert!(matches!(outcomes[0], CheckOutcome::Block(_)));
        assert!(outcomes[1..].iter().all(|o| *o == CheckOutcome::Clean));
    }
}
