//! Users Service Core Business Logic
//!
//! This crate provides the user directory: registration, password
//! authentication, lookups and profile updates on top of a pluggable
//! [`users_db::UserStore`] and [`users_auth::PasswordHasher`].

pub mod config;
pub mod directory;
pub mod error;
pub mod validation;

pub use config::DirectoryConfig;
pub use directory::{UserDirectory, UserUpdate};
pub use error::{CoreError, ErrorKind};
