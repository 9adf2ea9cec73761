//! Runtime configuration.
//!
//! Non-secret settings come from a TOML file; secrets come from the
//! environment and are read once at startup. A missing secret is a fatal
//! [`Error::Configuration`] before the server binds.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Complete graphgate configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub microsoft: MicrosoftSettings,
    #[serde(default)]
    pub session: SessionSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "graphgate.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Microsoft identity platform settings (non-secret half)
#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftSettings {
    /// Directory tenant, or "common" for multi-tenant sign-in
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Redirect URI registered with the application
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Requested scope set
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_tenant() -> String {
    "common".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/auth/microsoft/callback".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "openid",
        "profile",
        "email",
        "offline_access",
        "User.Read",
        "Files.Read.All",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for MicrosoftSettings {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

/// Session token lifetimes
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
}

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_refresh_ttl_days() -> i64 {
    7
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_days: default_refresh_ttl_days(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &str) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| Error::Configuration(format!("cannot read config file {path}: {err}")))?;
    let config: AppConfig = toml::from_str(&contents)
        .map_err(|err| Error::Configuration(format!("cannot parse config file {path}: {err}")))?;
    Ok(config)
}

/// Environment-only secrets; these never land in the TOML file.
#[derive(Clone)]
pub struct Secrets {
    pub microsoft_client_id: String,
    pub microsoft_client_secret: String,
    pub token_encryption_secret: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            microsoft_client_id: require_env("GRAPHGATE_MICROSOFT_CLIENT_ID")?,
            microsoft_client_secret: require_env("GRAPHGATE_MICROSOFT_CLIENT_SECRET")?,
            token_encryption_secret: require_env("GRAPHGATE_TOKEN_ENCRYPTION_SECRET")?,
            access_token_secret: require_env("GRAPHGATE_ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: require_env("GRAPHGATE_REFRESH_TOKEN_SECRET")?,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Configuration(format!("{name} is not set"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.path, "graphgate.db");
        assert_eq!(config.microsoft.tenant, "common");
        assert!(config.microsoft.scopes.contains(&"offline_access".to_string()));
        assert_eq!(config.session.access_ttl_minutes, 15);
        assert_eq!(config.session.refresh_ttl_days, 7);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind = "127.0.0.1"
            port = 8080

            [database]
            path = "/var/lib/graphgate/state.db"

            [microsoft]
            tenant = "contoso.onmicrosoft.com"
            redirect_uri = "https://app.contoso.com/callback"
            scopes = ["openid", "User.Read"]

            [session]
            access_ttl_minutes = 5
            refresh_ttl_days = 30
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "/var/lib/graphgate/state.db");
        assert_eq!(config.microsoft.tenant, "contoso.onmicrosoft.com");
        assert_eq!(config.microsoft.scopes.len(), 2);
        assert_eq!(config.session.access_ttl_minutes, 5);
        assert_eq!(config.session.refresh_ttl_days, 30);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [server]
            port = 9000
        "#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.microsoft.tenant, "common");
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        // Use a name no other test or environment sets
        std::env::remove_var("GRAPHGATE_TEST_UNSET_SECRET");
        let result = require_env("GRAPHGATE_TEST_UNSET_SECRET");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        std::env::set_var("GRAPHGATE_TEST_EMPTY_SECRET", "");
        let result = require_env("GRAPHGATE_TEST_EMPTY_SECRET");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
