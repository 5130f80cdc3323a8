//! Users Service Database Layer
//!
//! This crate provides the persistence abstraction for user records: the
//! [`UserStore`] trait, a SQLite implementation via sqlx and an in-memory
//! implementation.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;
pub mod utils;

pub use error::{DbError, OptionalExt};
pub use memory::MemoryStore;
pub use models::*;
pub use repository::Database;
pub use store::UserStore;
