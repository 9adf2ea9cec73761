//! HTTP API surface.
//!
//! Thin boundary over the core components: binds inbound requests to typed
//! payloads, invokes the core operation, and serializes the
//! `{statusCode, success, message, data}` envelope on both success and
//! error paths. Error kinds map to status codes here and nowhere else.

mod graph;
mod session;

use std::sync::Arc;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::credentials::CredentialStore;
use crate::error::Error;
use crate::graph::GraphClient;
use crate::oauth::OAuthClient;
use crate::principals::PrincipalDirectory;
use crate::session::{extract_bearer_token, SessionClaims, SessionIssuer, TokenClass};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub oauth: Arc<OAuthClient>,
    pub graph: Arc<GraphClient>,
    pub store: Arc<CredentialStore>,
    pub issuer: Arc<SessionIssuer>,
    pub directory: Arc<dyn PrincipalDirectory>,
}

/// Uniform response envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub data: Value,
}

/// Error wrapper that maps domain kinds to HTTP status codes.
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NoCredentials(_) => StatusCode::BAD_REQUEST,
            Error::ExternalAuth(_) => StatusCode::BAD_GATEWAY,
            Error::Unauthorized
            | Error::InvalidToken
            | Error::PrincipalNotFound
            | Error::Integrity => StatusCode::UNAUTHORIZED,
            Error::Configuration(_)
            | Error::Storage(_)
            | Error::Transport(_)
            | Error::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!(error = %self.0, status = %status, "Request failed");

        let body = Json(ApiResponse {
            status_code: status.as_u16(),
            success: false,
            message: self.0.to_string(),
            data: Value::Null,
        });

        (status, body).into_response()
    }
}

/// Serialize a success envelope.
pub(crate) fn ok_response(
    status: StatusCode,
    message: &str,
    data: impl Serialize,
) -> Result<Response, AppError> {
    let data = serde_json::to_value(data).map_err(Error::from)?;
    let body = Json(ApiResponse {
        status_code: status.as_u16(),
        success: true,
        message: message.to_string(),
        data,
    });
    Ok((status, body).into_response())
}

/// Resolve the calling principal from the Authorization header.
pub(crate) fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<SessionClaims, AppError> {
    let token = extract_bearer_token(headers)?;
    Ok(state.issuer.verify(&token, TokenClass::Access)?)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/graph/auth/login-url", get(graph::login_url))
        .route("/api/graph/auth/obtain-tokens", post(graph::obtain_tokens))
        .route(
            "/api/graph/auth/obtain-tokens-outlook",
            post(graph::obtain_tokens_outlook),
        )
        .route("/api/graph/auth/refresh-tokens", post(graph::refresh_tokens))
        .route("/api/graph/auth/disconnect", delete(graph::disconnect))
        .route("/api/graph/account", get(graph::account))
        .route("/api/graph/drive/items", get(graph::drive_items))
        .route("/api/graph/drive/recent", get(graph::drive_recent))
        .route("/api/graph/drive/shared", get(graph::drive_shared))
        .route("/api/graph/drive/search", get(graph::drive_search))
        .route("/api/graph/status", get(graph::status))
        .route("/api/session/refresh", post(session::refresh))
        .with_state(Arc::new(state))
}
