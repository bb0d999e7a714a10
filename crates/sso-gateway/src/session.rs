//! Session token extraction.
//!
//! The archive's web client sends its token in the `Girder-Token` header;
//! browsers following a redirect only carry the `girderToken` cookie.

use axum::http::{header, HeaderMap};

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "girder-token";
/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "girderToken";

/// Returns the session token from the header, falling back to the cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
