//! Session token issuing, verification and refresh.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::principals::{Principal, PrincipalDirectory, Role};

/// Which of the two session-token classes a token belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenClass {
    Access,
    Refresh,
}

/// Claims carried by both session-token classes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signed access/refresh pair returned on login and refresh.
#[derive(Clone, Debug, Serialize)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// Signing configuration: a distinct secret and lifetime per class.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Issues and verifies the application's own bearer tokens.
///
/// Stateless per call: tokens are self-contained and there is no
/// server-side revocation list.
pub struct SessionIssuer {
    config: SessionConfig,
}

impl SessionIssuer {
    /// Missing signing secrets are a fatal startup condition.
    pub fn new(config: SessionConfig) -> Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(Error::Configuration(
                "session token signing secrets are not set".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Issue a fresh access/refresh pair for a principal.
    ///
    /// Both tokens carry the same claim set; only the signing secret and
    /// the expiry differ.
    pub fn issue(&self, principal: &Principal) -> Result<SessionTokens> {
        Ok(SessionTokens {
            access: self.sign(principal, TokenClass::Access)?,
            refresh: self.sign(principal, TokenClass::Refresh)?,
        })
    }

    /// Verify a token against the secret for its claimed class.
    ///
    /// Signature failure, structural corruption and expiry all surface as
    /// the same [`Error::InvalidToken`]; the sub-reason is logged at debug
    /// level only.
    pub fn verify(&self, token: &str, class: TokenClass) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret(class).as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(class = ?class, kind = ?err.kind(), "Session token rejected");
            Error::InvalidToken
        })
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// Re-reads the principal so a deleted account or a changed role takes
    /// effect now rather than at natural token expiry.
    pub fn refresh(
        &self,
        refresh_token: &str,
        directory: &dyn PrincipalDirectory,
    ) -> Result<SessionTokens> {
        let claims = self.verify(refresh_token, TokenClass::Refresh)?;
        let principal = directory
            .find_by_id(&claims.id)?
            .ok_or(Error::PrincipalNotFound)?;
        self.issue(&principal)
    }

    fn secret(&self, class: TokenClass) -> &str {
        match class {
            TokenClass::Access => &self.config.access_secret,
            TokenClass::Refresh => &self.config.refresh_secret,
        }
    }

    fn ttl(&self, class: TokenClass) -> Duration {
        match class {
            TokenClass::Access => self.config.access_ttl,
            TokenClass::Refresh => self.config.refresh_ttl,
        }
    }

    fn sign(&self, principal: &Principal, class: TokenClass) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            id: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + self.ttl(class)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret(class).as_bytes()),
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "Failed to sign session token");
            Error::InvalidToken
        })
    }
}
