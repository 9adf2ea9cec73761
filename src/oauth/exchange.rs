//! Token-endpoint exchanges.
//!
//! Both grant types post the same form-encoded request shape and parse the
//! same response JSON. Each call is single-attempt with a bounded timeout;
//! the refresh-and-retry policy lives in the Graph call wrapper.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use super::MicrosoftOAuthConfig;
use crate::credentials::TokenSet;
use crate::error::{Error, Result};

/// Bound on every call to the token endpoint
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Token endpoint response (Microsoft identity platform v2.0).
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub token_type: String,
    pub scope: String,
    pub expires_in: i64,
    #[serde(default)]
    pub ext_expires_in: Option<i64>,
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
}

/// Client for the identity provider's token endpoint.
pub struct OAuthClient {
    config: MicrosoftOAuthConfig,
    http: reqwest::Client,
    token_url: String,
}

impl OAuthClient {
    /// Create a client using the token endpoint derived from the tenant.
    pub fn new(config: MicrosoftOAuthConfig) -> Self {
        let token_url = config.token_endpoint();
        Self::with_token_url(config, token_url)
    }

    /// Create a client with a custom token endpoint (for testing with a
    /// mock server).
    pub fn with_token_url(config: MicrosoftOAuthConfig, token_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self {
            config,
            http,
            token_url,
        }
    }

    pub fn config(&self) -> &MicrosoftOAuthConfig {
        &self.config
    }

    /// Exchange an authorization code for the token triple.
    ///
    /// `redirect_uri` must match the one used in the authorization request.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet> {
        let scopes = self.config.scopes.join(" ");
        let mut form = HashMap::new();
        form.insert("client_id", self.config.client_id.as_str());
        form.insert("client_secret", self.config.client_secret.as_str());
        form.insert("scope", scopes.as_str());
        form.insert("grant_type", "authorization_code");
        form.insert("code", code);
        form.insert("redirect_uri", redirect_uri);

        self.post_token_request(&form).await
    }

    /// Exchange a refresh token for a fresh triple.
    ///
    /// The provider may rotate the refresh token: callers must persist all
    /// three returned values, not just the access token.
    pub async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<TokenSet> {
        let scopes = self.config.scopes.join(" ");
        let mut form = HashMap::new();
        form.insert("client_id", self.config.client_id.as_str());
        form.insert("client_secret", self.config.client_secret.as_str());
        form.insert("scope", scopes.as_str());
        form.insert("grant_type", "refresh_token");
        form.insert("refresh_token", refresh_token);

        self.post_token_request(&form).await
    }

    async fn post_token_request(&self, form: &HashMap<&str, &str>) -> Result<TokenSet> {
        tracing::debug!(url = %self.token_url, grant_type = ?form.get("grant_type"), "Requesting tokens from identity provider");

        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|err| Error::ExternalAuth(format!("token endpoint unreachable: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::ExternalAuth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|err| Error::ExternalAuth(format!("malformed token response: {err}")))?;

        tracing::debug!(expires_in = tokens.expires_in, "Token exchange successful");

        Ok(TokenSet {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
        })
    }
}
