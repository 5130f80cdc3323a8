//! Core error types

use thiserror::Error;
use users_auth::AuthError;
use users_db::{DbError, UserField};

pub const USERNAME_BLANK: &str = "Username cannot be blank";
pub const INVALID_EMAIL: &str = "Invalid email";
pub const PASSWORD_TOO_SHORT: &str = "Password must contain at least 8 characters";
pub const INVALID_IMAGE: &str = "Invalid image URL";
pub const USER_EXISTS: &str = "User already exists";
pub const EMAIL_TAKEN: &str = "Email is taken";
pub const USER_NOT_FOUND: &str = "User not found";

/// Client-visible message for internal failures
pub const INTERNAL_MESSAGE: &str = "Internal Server Error";

/// Discriminant of [`CoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    Unauthenticated,
    Internal,
}

#[derive(Error, Debug)]
pub enum CoreError {
    /// One or more input rules were violated, in evaluation order
    #[error("{}", .0.join("; "))]
    InvalidArgument(Vec<String>),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid(message: &str) -> Self {
        CoreError::InvalidArgument(vec![message.to_string()])
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Messages safe to show to clients
    pub fn messages(&self) -> Vec<String> {
        match self {
            CoreError::InvalidArgument(messages) => messages.clone(),
            CoreError::AlreadyExists(m) | CoreError::NotFound(m) | CoreError::Unauthenticated(m) => {
                vec![m.clone()]
            }
            CoreError::Internal(_) => vec![INTERNAL_MESSAGE.to_string()],
        }
    }
}

impl From<DbError> for CoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => CoreError::NotFound(USER_NOT_FOUND.to_string()),
            DbError::Duplicate(UserField::Username) => CoreError::AlreadyExists(USER_EXISTS.to_string()),
            DbError::Duplicate(UserField::Email) => CoreError::AlreadyExists(EMAIL_TAKEN.to_string()),
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for CoreError {
    fn from(e: AuthError) -> Self {
        if e.is_unauthenticated() {
            CoreError::Unauthenticated(e.to_string())
        } else {
            CoreError::Internal(e.to_string())
        }
    }
}
