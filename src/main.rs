use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use graphgate::api::{create_router, AppState};
use graphgate::config::{load_config, AppConfig, Secrets};
use graphgate::credentials::CredentialStore;
use graphgate::crypto::TokenCipher;
use graphgate::graph::GraphClient;
use graphgate::oauth::{MicrosoftOAuthConfig, OAuthClient};
use graphgate::principals::SqliteDirectory;
use graphgate::session::{SessionConfig, SessionIssuer};

const CONFIG_PATH: &str = "graphgate.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graphgate=info".into()),
        )
        .init();

    let config = if std::path::Path::new(CONFIG_PATH).exists() {
        load_config(CONFIG_PATH)?
    } else {
        AppConfig::default()
    };

    // Secrets are required before anything binds
    let secrets = Secrets::from_env()?;

    let cipher = Arc::new(TokenCipher::new(&secrets.token_encryption_secret)?);
    let store = Arc::new(CredentialStore::new(&config.database.path, cipher)?);
    let directory = Arc::new(SqliteDirectory::new(&config.database.path)?);

    let oauth = Arc::new(OAuthClient::new(MicrosoftOAuthConfig {
        client_id: secrets.microsoft_client_id.clone(),
        client_secret: secrets.microsoft_client_secret.clone(),
        tenant: config.microsoft.tenant.clone(),
        redirect_uri: config.microsoft.redirect_uri.clone(),
        scopes: config.microsoft.scopes.clone(),
    }));
    let graph = Arc::new(GraphClient::new(oauth.clone(), store.clone()));

    let issuer = Arc::new(SessionIssuer::new(SessionConfig {
        access_secret: secrets.access_token_secret.clone(),
        refresh_secret: secrets.refresh_token_secret.clone(),
        access_ttl: chrono::Duration::minutes(config.session.access_ttl_minutes),
        refresh_ttl: chrono::Duration::days(config.session.refresh_ttl_days),
    })?);

    let app = create_router(AppState {
        oauth,
        graph,
        store,
        issuer,
        directory,
    });

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "graphgate listening");
    axum::serve(listener, app).await?;

    Ok(())
}
