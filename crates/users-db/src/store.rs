//! User store trait

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{User, UserField};

/// Persistence contract for user records
///
/// Records are keyed by username. Implementations must enforce uniqueness of
/// both the key and the email field themselves, so that two racing writers
/// cannot both succeed; the losing writer gets [`DbError::Duplicate`].
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a record unless its username is already taken
    async fn create_if_absent(&self, user: &User) -> Result<(), DbError>;

    /// Get the record stored under a username
    async fn get(&self, username: &str) -> Result<User, DbError>;

    /// Find the first record whose `field` equals `value`
    async fn find_one_by_field(&self, field: UserField, value: &str) -> Result<User, DbError>;

    /// Overwrite the record stored under `key`
    ///
    /// When `user.username` differs from `key` the record moves to the new key.
    /// A missing `key` results in an insert.
    async fn set(&self, key: &str, user: &User) -> Result<(), DbError>;
}
