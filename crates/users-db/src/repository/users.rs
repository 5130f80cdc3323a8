//! User operations

use async_trait::async_trait;
use tracing::debug;

use super::{map_write_error, Database};
use crate::error::DbError;
use crate::models::{User, UserField};
use crate::store::UserStore;

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, bio, image, created_at, updated_at
    FROM users
"#;

#[async_trait]
impl UserStore for Database {
    async fn create_if_absent(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (username, id, email, password_hash, bio, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!("Inserted user: {}", user.username);
        Ok(())
    }

    async fn get(&self, username: &str) -> Result<User, DbError> {
        self.find_one_by_field(UserField::Username, username).await
    }

    async fn find_one_by_field(&self, field: UserField, value: &str) -> Result<User, DbError> {
        // `field` is a closed enum, so formatting its column name is safe
        let sql = format!("{} WHERE {} = ? LIMIT 1", SELECT_USER, field.as_str());

        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("user with {} '{}'", field, value)))?;

        Ok(User::try_from(&row)?)
    }

    async fn set(&self, key: &str, user: &User) -> Result<(), DbError> {
        if key == user.username {
            sqlx::query(
                r#"
                INSERT INTO users (username, id, email, password_hash, bio, image, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(username) DO UPDATE SET
                    email = excluded.email,
                    password_hash = excluded.password_hash,
                    bio = excluded.bio,
                    image = excluded.image,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&user.username)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.bio)
            .bind(&user.image)
            .bind(user.created_at.to_rfc3339())
            .bind(user.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

            debug!("Stored user: {}", user.username);
            return Ok(());
        }

        // Re-key: the primary key column is updated in place, so the move is a
        // single statement and a taken target name fails on the constraint.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, password_hash = ?, bio = ?, image = ?, updated_at = ?
            WHERE username = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(user.updated_at.to_rfc3339())
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return self.create_if_absent(user).await;
        }

        debug!("Renamed user: {} -> {}", key, user.username);
        Ok(())
    }
}
