//! Authentication error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthHeader,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token lifetime out of range: {0}s")]
    TokenLifetime(u64),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Whether the error means the caller failed to prove an identity,
    /// as opposed to a fault on our side
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(
            self,
            AuthError::PasswordHash(_) | AuthError::TokenLifetime(_) | AuthError::Jwt(_)
        )
    }
}
