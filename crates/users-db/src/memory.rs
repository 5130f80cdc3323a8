//! In-memory user store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::DbError;
use crate::models::{User, UserField};
use crate::store::UserStore;

/// User store kept in process memory
///
/// All checks and writes happen under one write lock, which gives the same
/// conditional-create guarantees as the unique constraints of [`crate::Database`].
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

fn email_taken(users: &HashMap<String, User>, email: &str, except: Option<&str>) -> bool {
    users
        .iter()
        .any(|(key, u)| u.email == email && Some(key.as_str()) != except)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_if_absent(&self, user: &User) -> Result<(), DbError> {
        let mut users = self.users.write();

        if users.contains_key(&user.username) {
            return Err(DbError::Duplicate(UserField::Username));
        }
        if email_taken(&users, &user.email, None) {
            return Err(DbError::Duplicate(UserField::Email));
        }

        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<User, DbError> {
        self.users
            .read()
            .get(username)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("user with username '{}'", username)))
    }

    async fn find_one_by_field(&self, field: UserField, value: &str) -> Result<User, DbError> {
        if field == UserField::Username {
            return self.get(value).await;
        }

        self.users
            .read()
            .values()
            .find(|u| u.field(field) == value)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("user with {} '{}'", field, value)))
    }

    async fn set(&self, key: &str, user: &User) -> Result<(), DbError> {
        let mut users = self.users.write();

        if key != user.username && users.contains_key(&user.username) {
            return Err(DbError::Duplicate(UserField::Username));
        }
        if email_taken(&users, &user.email, Some(key)) {
            return Err(DbError::Duplicate(UserField::Email));
        }

        users.remove(key);
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }
}
