//! Bearer token extraction for Axum requests

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::jwt::Claims;

/// Header set by API gateways that terminate authentication upstream
pub const FORWARDED_AUTHORIZATION: &str = "x-forwarded-authorization";

/// Authenticated user information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub username: String,
}

impl AuthUser {
    /// Create from validated JWT claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims.sub.clone(),
        }
    }
}

/// Extract bearer token from authorization header value
fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Locate the bearer token, preferring the forwarded header over `Authorization`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(FORWARDED_AUTHORIZATION)
        .or_else(|| headers.get(AUTHORIZATION))
        .ok_or(AuthError::MissingAuthHeader)?;

    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    extract_bearer_token(value)
}
