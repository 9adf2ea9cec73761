//! Session token rotation endpoint.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Response, Json};
use serde::Deserialize;

use super::{ok_response, AppError, AppState};

#[derive(Deserialize)]
pub struct RefreshSessionRequest {
    token: String,
}

/// POST /api/session/refresh
///
/// Verifies the refresh token, re-reads the principal, and issues a fresh
/// access/refresh pair.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshSessionRequest>,
) -> Result<Response, AppError> {
    let tokens = state
        .issuer
        .refresh(&request.token, state.directory.as_ref())?;

    ok_response(StatusCode::OK, "Tokens refreshed successfully", tokens)
}
