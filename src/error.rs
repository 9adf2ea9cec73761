//! Error taxonomy shared by all core components.
//!
//! Every kind propagates to the HTTP boundary unchanged; the boundary maps
//! kind to status code and logs the original cause.

use thiserror::Error;

use crate::credentials::CredentialKey;

#[derive(Debug, Error)]
pub enum Error {
    /// Required secret or setting absent at startup. The process must not
    /// start serving traffic.
    #[error("required configuration missing: {0}")]
    Configuration(String),

    /// No Microsoft grant on file for the principal. The caller must run
    /// the authorization-code flow; this is never retried.
    #[error("no Microsoft credentials on file for {0}")]
    NoCredentials(CredentialKey),

    /// The identity provider rejected an exchange (bad code, bad refresh
    /// token, provider outage). Carries the provider's diagnostic body.
    #[error("identity provider rejected the exchange: {0}")]
    ExternalAuth(String),

    /// Stored ciphertext failed authentication on decrypt. The plaintext is
    /// unrecoverable; the principal has to re-authorize.
    #[error("stored token failed integrity verification")]
    Integrity,

    /// The authenticated-call state machine failed after its single
    /// refresh-and-retry cycle.
    #[error("Microsoft Graph call failed after token refresh")]
    Unauthorized,

    /// Session token rejected. Signature failure, structural corruption and
    /// expiry all collapse into this one kind; the sub-reason is logged only.
    #[error("invalid or expired session token")]
    InvalidToken,

    /// Session refresh for a principal that no longer exists.
    #[error("principal no longer exists")]
    PrincipalNotFound,

    #[error("credential storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
