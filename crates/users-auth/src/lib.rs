//! Users Service Authentication
//!
//! This crate provides password hashing, bearer-token issuance and
//! validation, and helpers for reading bearer tokens off HTTP headers.

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use error::AuthError;
pub use jwt::{Claims, TokenService};
pub use middleware::{bearer_token, AuthUser, FORWARDED_AUTHORIZATION};
pub use password::{Argon2Hasher, PasswordHasher};
