//! Bearer token issuance and validation

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::AuthError;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and validates HS256 tokens with a process-wide secret and TTL
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Lifetime of issued tokens
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `username` valid from now until now + TTL
    pub fn issue(&self, username: &str) -> Result<String, AuthError> {
        let lifetime = self.ttl.as_secs();
        let now = Utc::now().timestamp();
        let exp = i64::try_from(lifetime)
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or(AuthError::TokenLifetime(lifetime))?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp,
        };

        debug!("Issuing token for user: {}", username);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(AuthError::Jwt)
    }

    /// Verify signature and expiry, returning the claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}
