use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Header carrying the authenticated user id, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Identity of the submitter, extracted once per request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: i64,
}

/// Parse the user id header into a [`UserContext`]
pub fn parse_user_id(value: Option<&str>) -> Option<UserContext> {
    value?
        .trim()
        .parse::<i64>()
        .ok()
        .map(|user_id| UserContext { user_id })
}

/// Users allowed to read the moderation review queue.
/// An empty list admits nobody.
#[derive(Clone, Debug, Default)]
pub struct ModeratorAllowList {
    user_ids: Arc<HashSet<i64>>,
}

impl ModeratorAllowList {
    pub fn new(user_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            user_ids: Arc::new(user_ids.into_iter().collect()),
        }
    }

    pub fn permits(&self, user_ctx: &UserContext) -> bool {
        self.user_ids.contains(&user_ctx.user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }
}

/// Middleware that resolves the caller and rejects anonymous requests
pub async fn user_context_middleware(mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok());

    let Some(user_ctx) = parse_user_id(header) else {
        tracing::debug!(path = %req.uri().path(), "Rejecting request without a valid user id");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Missing or invalid X-User-Id header"})),
        )
            .into_response();
    };

    req.extensions_mut().insert(user_ctx);

    next.run(req).await
}
