//! Bearer token extraction from HTTP headers.

use axum::http::HeaderMap;

use crate::error::{Error, Result};

/// Extract the bearer token from an `Authorization: Bearer <token>` header.
///
/// A missing header, a non-Bearer scheme and an empty token all surface as
/// [`Error::InvalidToken`]; the sub-reason only reaches the logs.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String> {
    let header_value = headers
        .get("authorization")
        .ok_or_else(|| {
            tracing::debug!("Authorization header not present");
            Error::InvalidToken
        })?
        .to_str()
        .map_err(|_| {
            tracing::debug!("Authorization header is not valid UTF-8");
            Error::InvalidToken
        })?;

    parse_bearer(header_value)
}

fn parse_bearer(header_value: &str) -> Result<String> {
    let parts: Vec<&str> = header_value.splitn(2, ' ').collect();

    if parts.len() != 2 || !parts[0].eq_ignore_ascii_case("bearer") {
        tracing::debug!("Authorization header is not a Bearer credential");
        return Err(Error::InvalidToken);
    }

    let token = parts[1].trim();
    if token.is_empty() {
        tracing::debug!("Bearer token is empty");
        return Err(Error::InvalidToken);
    }

    Ok(token.to_string())
}
