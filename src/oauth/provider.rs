//! Identity provider endpoints and authorization URL assembly.

/// Microsoft OAuth application settings.
///
/// Client credentials and the tenant come from environment secrets; the
/// redirect URI and scope set come from the configuration file.
#[derive(Clone, Debug)]
pub struct MicrosoftOAuthConfig {
    /// Application (client) id from the Azure registration
    pub client_id: String,

    /// Client secret from the Azure registration
    pub client_secret: String,

    /// Directory tenant, or "common" for multi-tenant sign-in
    pub tenant: String,

    /// Default redirect URI registered with the application
    pub redirect_uri: String,

    /// Requested scope set (space-joined on the wire)
    pub scopes: Vec<String>,
}

impl MicrosoftOAuthConfig {
    /// v2.0 authorization endpoint for the configured tenant.
    pub fn authorize_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/authorize",
            self.tenant
        )
    }

    /// v2.0 token endpoint for the configured tenant.
    pub fn token_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant
        )
    }

    /// Assemble the authorization redirect URL.
    ///
    /// Pure function of configuration: fixed `response_type=code` and
    /// `response_mode=query`, the effective redirect URI (override wins
    /// over the configured default) and the space-joined scope set.
    pub fn build_authorize_url(&self, redirect_override: Option<&str>) -> String {
        let redirect_uri = redirect_override.unwrap_or(&self.redirect_uri);
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&response_mode=query&scope={}",
            self.authorize_endpoint(),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes),
        )
    }
}
