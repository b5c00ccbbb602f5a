use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;
use winops_core::client::API_KEY_HEADER;

use super::error::ApiError;
use super::AgentState;

/// Reject any request whose `X-API-Key` does not match the agent secret.
pub async fn require_secret(
    State(state): State<AgentState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if secret_matches(provided, state.secret.as_bytes()) {
        Ok(next.run(req).await)
    } else {
        tracing::warn!(uri = %req.uri(), "rejected request with invalid API key");
        Err(ApiError::Unauthorized)
    }
}

fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    !expected.is_empty() && bool::from(provided.ct_eq(expected))
}
