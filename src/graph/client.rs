//! The authenticated-call wrapper.
//!
//! Per logical call the wrapper moves through:
//! have credentials -> attempt with stored token -> success, or
//! refresh -> retry once -> success or terminal failure.
//!
//! The first attempt's failure cause is deliberately not inspected before
//! refreshing: the provider's responses for expired, malformed and revoked
//! tokens are not reliably distinguishable from here, and one spurious
//! refresh is cheaper than misclassifying. The retry bound is exactly one.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{AccountInfo, DriveItem, DriveItemList, GRAPH_BASE_URL};
use crate::credentials::{CredentialKey, CredentialStore, TokenSet};
use crate::error::{Error, Result};
use crate::oauth::OAuthClient;

/// Bound on every resource-API call
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Microsoft Graph with transparent token refresh.
///
/// Borrows credential records from the store: reads them for every call,
/// overwrites them after a successful refresh, and deletes them only
/// through the explicit [`GraphClient::disconnect`] operation.
pub struct GraphClient {
    http: reqwest::Client,
    oauth: Arc<OAuthClient>,
    store: Arc<CredentialStore>,
    refresh_locks: DashMap<CredentialKey, Arc<Mutex<()>>>,
    base_url: String,
}

impl GraphClient {
    /// Create a client against the production Graph endpoint.
    pub fn new(oauth: Arc<OAuthClient>, store: Arc<CredentialStore>) -> Self {
        Self::with_base_url(oauth, store, GRAPH_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing with a mock
    /// server).
    pub fn with_base_url(
        oauth: Arc<OAuthClient>,
        store: Arc<CredentialStore>,
        base_url: String,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .user_agent("graphgate/0.1")
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            oauth,
            store,
            refresh_locks: DashMap::new(),
            base_url,
        }
    }

    /// Issue an authenticated Graph call on behalf of a principal.
    ///
    /// Returns the parsed JSON body on success. Fails with
    /// [`Error::NoCredentials`] when no grant is on file (terminal, zero
    /// HTTP calls made) and [`Error::Unauthorized`] when the call still
    /// fails after the single refresh-and-retry cycle.
    pub async fn call(
        &self,
        key: &CredentialKey,
        method: Method,
        url: &str,
        content_type: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<Value> {
        let tokens = self
            .store
            .get(key)?
            .ok_or_else(|| Error::NoCredentials(key.clone()))?;

        match self
            .attempt(method.clone(), url, &tokens.access_token, content_type, body.clone())
            .await
        {
            Ok(value) => Ok(value),
            Err(first_err) => {
                tracing::debug!(
                    principal = %key,
                    error = %first_err,
                    "Graph call failed with stored token, refreshing"
                );

                let fresh = match self.refresh_and_store(key, &tokens).await {
                    Ok(fresh) => fresh,
                    Err(refresh_err) => {
                        tracing::warn!(
                            principal = %key,
                            error = %refresh_err,
                            "Token refresh failed"
                        );
                        return Err(Error::Unauthorized);
                    }
                };

                match self
                    .attempt(method, url, &fresh.access_token, content_type, body)
                    .await
                {
                    Ok(value) => Ok(value),
                    Err(retry_err) => {
                        tracing::warn!(
                            principal = %key,
                            error = %retry_err,
                            "Graph call failed after token refresh"
                        );
                        Err(Error::Unauthorized)
                    }
                }
            }
        }
    }

    /// Refresh the stored grant without making a resource call.
    ///
    /// Used by the explicit refresh endpoint. Unlike the wrapper's internal
    /// recovery leg, exchange failures surface here as their own kind.
    pub async fn refresh_tokens(&self, key: &CredentialKey) -> Result<TokenSet> {
        let tokens = self
            .store
            .get(key)?
            .ok_or_else(|| Error::NoCredentials(key.clone()))?;
        self.refresh_and_store(key, &tokens).await
    }

    /// Remove the stored grant for a principal.
    ///
    /// Returns whether a grant was actually on file.
    pub fn disconnect(&self, key: &CredentialKey) -> Result<bool> {
        let removed = self.store.delete(key)?;
        if removed {
            tracing::info!(principal = %key, "Microsoft account disconnected");
        }
        Ok(removed)
    }

    /// Lightweight connection probe.
    ///
    /// Collapses every failure into `false`: "no grant on file" and
    /// "provider rejected the refresh" are deliberately indistinguishable
    /// here. Callers that need the distinction use [`GraphClient::call`].
    pub async fn is_connected(&self, key: &CredentialKey) -> bool {
        self.get_account(key).await.is_ok()
    }

    // ---- Typed Graph operations -------------------------------------

    /// Fetch the account profile (`GET /me`).
    pub async fn get_account(&self, key: &CredentialKey) -> Result<AccountInfo> {
        let url = format!("{}/me", self.base_url);
        let value = self.call(key, Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// List the items at the OneDrive root (`GET /me/drive/root/children`).
    pub async fn list_drive_items(&self, key: &CredentialKey) -> Result<DriveItemList> {
        let url = format!("{}/me/drive/root/children", self.base_url);
        let value = self.call(key, Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// List recently used OneDrive items (`GET /me/drive/recent`).
    pub async fn recent_drive_items(&self, key: &CredentialKey) -> Result<DriveItemList> {
        let url = format!("{}/me/drive/recent", self.base_url);
        let value = self.call(key, Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// List items shared with the principal (`GET /me/drive/sharedWithMe`).
    pub async fn shared_with_me(&self, key: &CredentialKey) -> Result<DriveItemList> {
        let url = format!("{}/me/drive/sharedWithMe", self.base_url);
        let value = self.call(key, Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Search the drive by file name (`GET /me/drive/root/search`).
    pub async fn search_drive(&self, key: &CredentialKey, query: &str) -> Result<DriveItemList> {
        let url = format!(
            "{}/me/drive/root/search(q='{}')?select=name,id,webUrl",
            self.base_url,
            urlencoding::encode(query)
        );
        let value = self.call(key, Method::GET, &url, None, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Upload file content into the principal's OneDrive
    /// (`PUT /me/drive/root:/{path}:/content`).
    pub async fn upload_file(
        &self,
        key: &CredentialKey,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DriveItem> {
        let url = format!("{}/me/drive/root:/{}:/content", self.base_url, path);
        let value = self
            .call(key, Method::PUT, &url, Some(content_type), Some(bytes))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // ---- Internals ---------------------------------------------------

    /// One request attempt; any non-2xx status or transport failure is an
    /// error, eligible for the caller's single recovery cycle.
    async fn attempt(
        &self,
        method: Method,
        url: &str,
        access_token: &str,
        content_type: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<Value> {
        let mut request = self.http.request(method, url).bearer_auth(access_token);
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Graph returned non-success status");
            return Err(Error::Unauthorized);
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        Ok(response.json().await?)
    }

    /// Exchange the refresh token and persist the returned triple.
    ///
    /// Refreshes for the same principal are serialized through a
    /// per-principal lock; a call that waited on the lock re-reads the
    /// store first and skips its own provider round-trip when another call
    /// already rotated the grant.
    async fn refresh_and_store(&self, key: &CredentialKey, stale: &TokenSet) -> Result<TokenSet> {
        let lock = self
            .refresh_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(current) = self.store.get(key)? {
            if current.access_token != stale.access_token {
                tracing::debug!(principal = %key, "Grant already rotated by a concurrent call");
                return Ok(current);
            }
        }

        let fresh = self.oauth.exchange_refresh_token(&stale.refresh_token).await?;
        self.store.upsert(key, &fresh)?;
        tracing::info!(principal = %key, "Microsoft tokens refreshed");
        Ok(fresh)
    }
}
