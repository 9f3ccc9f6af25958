use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;

use crate::{
    models::{QueueQuery, RateLimitError, SubmissionResponse, SubmissionStatus, SubmitContentRequest},
    monitoring::HealthStatus,
    security::{
        middleware::{ModeratorAllowList, UserContext},
        ModerationError,
        ModerationLogStore,
    },
    state::AppState,
};

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Collaborator failures never reach the client verbatim
fn unavailable(state: &AppState, operation: &'static str, e: ModerationError) -> ApiError {
    tracing::error!(operation, "Moderation collaborator failed: {}", e);
    state.metrics.record_store_error(operation);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"error": "Moderation service temporarily unavailable, please retry later"})),
    )
}

pub async fn submit_content(
    State(state): State<AppState>,
    Extension(user_ctx): Extension<UserContext>,
    Json(request): Json<SubmitContentRequest>,
) -> Result<Response, ApiError> {
    let user_id = user_ctx.user_id;

    let admitted = state
        .rate_limiter
        .check_rate_limit(user_id)
        .await
        .map_err(|e| unavailable(&state, "rate_limit", e))?;

    if !admitted {
        state.metrics.record_rate_limited();
        return Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitError::new(state.rate_limiter.policy().window_seconds)),
        )
            .into_response());
    }

    let verdict = state
        .pipeline
        .filter_content(&request.content, user_id)
        .await
        .map_err(|e| unavailable(&state, "filter_content", e))?;

    let response = SubmissionResponse::from_verdict(verdict);
    state.metrics.record_submission(response.status);

    let status_code = match response.status {
        SubmissionStatus::Published => StatusCode::CREATED,
        SubmissionStatus::PendingReview => StatusCode::ACCEPTED,
        SubmissionStatus::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
    };

    Ok((status_code, Json(response)).into_response())
}

pub async fn get_rate_limit_status(
    State(state): State<AppState>,
    Extension(user_ctx): Extension<UserContext>,
) -> Result<Response, ApiError> {
    let status = state
        .rate_limiter
        .rate_limit_status(user_ctx.user_id)
        .await
        .map_err(|e| unavailable(&state, "rate_limit_status", e))?;

    Ok(Json(status).into_response())
}

fn require_moderator(moderators: &ModeratorAllowList, user_ctx: &UserContext) -> Result<(), ApiError> {
    if moderators.permits(user_ctx) {
        return Ok(());
    }
    tracing::warn!(user_id = user_ctx.user_id, "Non-moderator requested the review queue");
    Err((
        StatusCode::FORBIDDEN,
        Json(json!({"error": "Only moderators may read the review queue"})),
    ))
}

pub async fn get_moderation_queue(
    State(state): State<AppState>,
    Extension(user_ctx): Extension<UserContext>,
    Query(query): Query<QueueQuery>,
) -> Result<Response, ApiError> {
    require_moderator(&state.moderators, &user_ctx)?;

    let entries = state
        .pipeline
        .log_store()
        .recent_entries(query.effective_limit())
        .await
        .map_err(|e| unavailable(&state, "moderation_queue", e))?;

    Ok(Json(entries).into_response())
}

/// Health check endpoint for load balancer
pub async fn health_check(State(state): State<AppState>) -> Response {
    let health = HealthStatus::check(&state.redis).await;

    let status_code = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health)).into_response()
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
