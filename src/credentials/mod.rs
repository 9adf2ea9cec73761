//! Encrypted custody of Microsoft OAuth grants.
//!
//! One record per principal, keyed either by the internal user id or by a
//! normalized email address. The three tokens of a grant (access, refresh,
//! id) always travel together: a record either holds all three or does not
//! exist. Tokens are encrypted with AES-256-GCM before they reach SQLite
//! and never persisted in plaintext.
//!
//! Lifecycle: created on the first successful authorization-code exchange,
//! overwritten in place on every refresh or re-consent, deleted on explicit
//! disconnect. A grant revoked at the provider side stays on file and is
//! only detected on next use.

use serde::{Deserialize, Serialize};

mod storage;

pub use storage::CredentialStore;

/// Owning principal of a stored Microsoft grant.
///
/// Two mutually exclusive modes: `User` ties the grant to an existing local
/// account, `Email` keys it by the external mailbox address for the Outlook
/// plugin flow where no local account exists yet.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    User(String),
    Email(String),
}

impl CredentialKey {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    /// Email keys are normalized to trimmed lowercase before use, so the
    /// same mailbox always maps to the same record.
    pub fn email(address: &str) -> Self {
        Self::Email(address.trim().to_lowercase())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Email(_) => "email",
        }
    }

    pub(crate) fn value(&self) -> &str {
        match self {
            Self::User(value) | Self::Email(value) => value,
        }
    }
}

impl std::fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// One principal's Microsoft grant as returned by the token endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenSet {
    /// Short-lived bearer credential for Graph calls
    pub access_token: String,

    /// Longer-lived credential for obtaining new access tokens; the
    /// provider may rotate it on every use
    pub refresh_token: String,

    /// OpenID Connect identity assertion from the same exchange
    pub id_token: String,
}
