//! Application session tokens.
//!
//! Distinct from the Microsoft tokens held in credential custody: these
//! are the backend's own short-lived access and longer-lived refresh JWTs,
//! each class signed with its own secret so one can never be accepted
//! where the other is required. Tokens are self-contained and not tracked
//! server-side; a leaked refresh token stays valid until natural expiry.

mod bearer;
mod issuer;

pub use bearer::extract_bearer_token;
pub use issuer::{SessionClaims, SessionConfig, SessionIssuer, SessionTokens, TokenClass};
