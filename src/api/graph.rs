//! Microsoft Graph endpoints: OAuth connect/disconnect and drive reads.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{authenticate, ok_response, AppError, AppState};
use crate::credentials::CredentialKey;
use crate::oauth::email_from_id_token;

#[derive(Deserialize)]
pub struct LoginUrlQuery {
    redirect: Option<String>,
}

#[derive(Serialize)]
struct LoginUrlData {
    #[serde(rename = "redirectUri")]
    redirect_uri: String,
}

/// GET /api/graph/auth/login-url
///
/// Returns the provider authorization URL the client should redirect to.
pub async fn login_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginUrlQuery>,
) -> Result<Response, AppError> {
    let url = state
        .oauth
        .config()
        .build_authorize_url(query.redirect.as_deref());

    ok_response(
        StatusCode::OK,
        "Microsoft login redirect URI obtained successfully",
        LoginUrlData { redirect_uri: url },
    )
}

#[derive(Deserialize)]
pub struct ObtainTokensRequest {
    code: String,
}

/// POST /api/graph/auth/obtain-tokens
///
/// Exchanges an authorization code and stores the grant for the
/// authenticated user. The tokens themselves never leave the backend.
pub async fn obtain_tokens(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ObtainTokensRequest>,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    debug!(principal = %key, "Exchanging authorization code");
    let redirect_uri = state.oauth.config().redirect_uri.clone();
    let tokens = state
        .oauth
        .exchange_authorization_code(&request.code, &redirect_uri)
        .await?;

    state.store.upsert(&key, &tokens)?;
    info!(principal = %key, "Microsoft account connected");

    ok_response(
        StatusCode::OK,
        "Microsoft tokens obtained successfully",
        (),
    )
}

#[derive(Deserialize)]
pub struct ObtainTokensOutlookRequest {
    code: String,
    redirect: String,
}

#[derive(Serialize)]
struct OutlookConnectData {
    email: String,
}

/// POST /api/graph/auth/obtain-tokens-outlook
///
/// Plugin variant: no local account exists, so the grant is keyed by the
/// email claim inside the id_token returned from the exchange.
pub async fn obtain_tokens_outlook(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ObtainTokensOutlookRequest>,
) -> Result<Response, AppError> {
    let tokens = state
        .oauth
        .exchange_authorization_code(&request.code, &request.redirect)
        .await?;

    let email = email_from_id_token(&tokens.id_token)?;
    let key = CredentialKey::email(&email);

    state.store.upsert(&key, &tokens)?;
    info!(principal = %key, "Microsoft account connected via Outlook plugin");

    ok_response(
        StatusCode::OK,
        "Microsoft tokens obtained successfully",
        OutlookConnectData { email },
    )
}

/// POST /api/graph/auth/refresh-tokens
///
/// Forces a refresh of the stored grant without making a resource call.
pub async fn refresh_tokens(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    state.graph.refresh_tokens(&key).await?;

    ok_response(
        StatusCode::OK,
        "Microsoft tokens refreshed successfully",
        (),
    )
}

/// DELETE /api/graph/auth/disconnect
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    state.graph.disconnect(&key)?;

    ok_response(
        StatusCode::OK,
        "Microsoft account disconnected successfully",
        (),
    )
}

/// GET /api/graph/account
pub async fn account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let account = state.graph.get_account(&key).await?;

    ok_response(
        StatusCode::OK,
        "Microsoft account received successfully",
        account,
    )
}

/// GET /api/graph/drive/items
pub async fn drive_items(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let items = state.graph.list_drive_items(&key).await?;

    ok_response(StatusCode::OK, "Files list fetched successfully", items)
}

/// GET /api/graph/drive/recent
pub async fn drive_recent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let items = state.graph.recent_drive_items(&key).await?;

    ok_response(StatusCode::OK, "Recent files fetched successfully", items)
}

/// GET /api/graph/drive/shared
pub async fn drive_shared(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let items = state.graph.shared_with_me(&key).await?;

    ok_response(StatusCode::OK, "Shared files fetched successfully", items)
}

#[derive(Deserialize)]
pub struct DriveSearchQuery {
    q: String,
}

/// GET /api/graph/drive/search?q=
pub async fn drive_search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DriveSearchQuery>,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let items = state.graph.search_drive(&key, &query.q).await?;

    ok_response(StatusCode::OK, "Search results fetched successfully", items)
}

#[derive(Serialize)]
struct ConnectionStatusData {
    connected: bool,
}

/// GET /api/graph/status
///
/// Reports whether the authenticated user has a working Microsoft
/// connection. "No grant on file" and "provider rejected the refresh" both
/// read as `connected: false` here.
pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let claims = authenticate(&state, &headers)?;
    let key = CredentialKey::user(claims.id);

    let connected = state.graph.is_connected(&key).await;

    ok_response(
        StatusCode::OK,
        "Connection status fetched successfully",
        ConnectionStatusData { connected },
    )
}
