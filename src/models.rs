use serde::{Deserialize, Serialize};

use crate::security::FilterVerdict;

#[derive(Deserialize)]
pub struct SubmitContentRequest {
    pub content: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Published,
    PendingReview,
    Rejected,
}

impl SubmissionStatus {
    pub fn for_verdict(verdict: &FilterVerdict) -> Self {
        if verdict.is_blocked {
            SubmissionStatus::Rejected
        } else if verdict.requires_moderation {
            SubmissionStatus::PendingReview
        } else {
            SubmissionStatus::Published
        }
    }

    /// Label used for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Published => "published",
            SubmissionStatus::PendingReview => "pending_review",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub status: SubmissionStatus,
    /// Sanitized HTML; empty for rejected submissions
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl SubmissionResponse {
    pub fn from_verdict(verdict: FilterVerdict) -> Self {
        let status = SubmissionStatus::for_verdict(&verdict);
        let content = match status {
            SubmissionStatus::Rejected => String::new(),
            _ => verdict.sanitized_content,
        };

        Self {
            status,
            content,
            warnings: verdict.warnings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateLimitError {
    pub error: String,
    pub message: String,
    pub retry_after_seconds: u64,
}

impl RateLimitError {
    pub fn new(window_seconds: u64) -> Self {
        Self {
            error: "rate_limit_exceeded".to_string(),
            message: format!(
                "Too many submissions. The limit resets {} seconds after your last accepted submission",
                window_seconds
            ),
            retry_after_seconds: window_seconds,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

impl QueueQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 200;

    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }
}
