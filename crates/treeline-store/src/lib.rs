//! Treeline Store - Local mirror persistence
//!
//! SQLite-backed storage for:
//! - Connector aggregates
//! - Selected folder roots and mirrored nodes
//! - Webhook channels (one per connector, enforced by the schema)
//! - Sync configs
//!
//! ## Architecture
//!
//! This crate implements the `IMirrorStore` port from `treeline-core`
//! using SQLite. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteMirrorStore`] - Full `IMirrorStore` implementation
//! - [`StoreError`] - Error types for store operations

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteMirrorStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
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
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
