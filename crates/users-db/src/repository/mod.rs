//! SQLite-backed user store

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbError;
use crate::models::UserField;

mod users;

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePool::connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Create a private in-memory database
    ///
    /// Every SQLite connection to `:memory:` opens a separate database, so the
    /// pool is pinned to a single connection.
    pub async fn in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY NOT NULL,
                id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                bio TEXT,
                image TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        info!("Database migrations completed");
        Ok(())
    }
}

/// Map unique-constraint violations to [`DbError::Duplicate`]
///
/// SQLite reports the offending column as `UNIQUE constraint failed: users.<column>`.
pub(crate) fn map_write_error(e: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        let field = if db_err.message().contains("users.email") {
            UserField::Email
        } else {
            UserField::Username
        };
        return DbError::Duplicate(field);
    }
    DbError::Connection(e)
}
