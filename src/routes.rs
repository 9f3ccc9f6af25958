use axum::{middleware, routing::get, routing::post, Router};
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::{handlers, security::middleware::user_context_middleware, state::AppState};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/content", post(handlers::submit_content))
        .route("/api/rate-limit", get(handlers::get_rate_limit_status))
        .route("/api/moderation/queue", get(handlers::get_moderation_queue))
        .layer(middleware::from_fn(user_context_middleware));

    Router::new()
        .merge(api)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
