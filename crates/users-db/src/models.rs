//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::fmt;
use uuid::Uuid;

/// Fields a user record can be looked up by with an equality query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Username,
    Email,
}

impl UserField {
    /// Column name in the `users` table
    pub fn as_str(&self) -> &'static str {
        match self {
            UserField::Username => "username",
            UserField::Email => "email",
        }
    }
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Value of a lookup field on this record
    pub fn field(&self, field: UserField) -> &str {
        match field {
            UserField::Username => &self.username,
            UserField::Email => &self.email,
        }
    }
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    /// Build the full record with a fresh id and timestamps; bio and image start unset
    pub fn into_user(self) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            bio: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        let id: String = row.try_get("id")?;
        Ok(User {
            id: Uuid::parse_str(&id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            bio: row.try_get("bio")?,
            image: row.try_get("image")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}
