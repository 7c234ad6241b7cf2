use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::http::{request_id, ApiError};

/// Reject requests without `Authorization: Bearer <api_key>`.
pub async fn require_bearer(
    State(api_key): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*api_key);

    if authorized {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        request_id = request_id(&request).unwrap_or("unknown"),
        path = %request.uri().path(),
        "Rejected unauthenticated admin request"
    );
    Err(ApiError::Unauthorized)
}
