//! API key check for `/api/*`

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::error::ApiError;
use super::ApiState;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Reject requests whose `X-API-Key` header is missing or wrong
///
/// Runs before the handler, so a rejected request never touches the store.
pub async fn require_api_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.api_key()) {
        debug!(path = %request.uri().path(), "Rejected request without valid API key");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
