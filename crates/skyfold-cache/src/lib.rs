//! Skyfold Cache - Local state persistence
//!
//! SQLite-based storage for:
//! - Item metadata
//! - Upload, deletion, reparent and enumeration task records
//! - The registry of locally cached file copies
//!
//! ## Architecture
//!
//! This crate implements the store ports from `skyfold-core` using SQLite as
//! the storage backend. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support and the shared write lock
//! - [`SqliteMetadataStore`] - `IMetadataStore` implementation
//! - [`SqliteTaskStore`] - Implements all four task record store ports
//! - [`SqliteCachedFileRegistry`] - `ICachedFileRegistry` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use skyfold_cache::{DatabasePool, SqliteMetadataStore, SqliteTaskStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/skyfold/skyfold.db")).await?;
//! let metadata = SqliteMetadataStore::new(pool.clone());
//! let tasks = SqliteTaskStore::new(pool);
//! # Ok(())
//! # }
//! ```

pub mod cached_files;
pub mod metadata;
pub mod pool;
mod rows;
pub mod tasks;

pub use cached_files::SqliteCachedFileRegistry;
pub use metadata::SqliteMetadataStore;
pub use pool::DatabasePool;
pub use tasks::SqliteTaskStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A row referenced by the operation does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
