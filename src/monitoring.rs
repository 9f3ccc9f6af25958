use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::models::SubmissionStatus;
use crate::redis_client::RedisClient;

/// Metrics tracker for submission outcomes and collaborator health
#[derive(Clone)]
pub struct MetricsTracker {
    handle: PrometheusHandle,
}

impl MetricsTracker {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle })
    }

    pub fn record_submission(&self, status: SubmissionStatus) {
        metrics::counter!("content_submissions_total", "outcome" => status.as_str()).increment(1);
    }

    pub fn record_rate_limited(&self) {
        metrics::counter!("rate_limit_rejections_total").increment(1);
    }

    pub fn record_store_error(&self, operation: &'static str) {
        metrics::counter!("moderation_store_errors_total", "operation" => operation).increment(1);
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Health check status for the server
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub redis_connected: bool,
    pub timestamp: i64,
}

impl HealthStatus {
    pub async fn check(redis: &RedisClient) -> Self {
        let redis_connected = match redis.ping().await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::warn!("Redis health check failed: {}", e);
                false
            }
        };

        Self {
            healthy: redis_connected,
            redis_connected,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
