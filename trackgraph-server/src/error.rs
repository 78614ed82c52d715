//! Error types for trackgraph-server
//!
//! Graph rule violations come from the core as [`GraphError`]; everything the
//! service adds on top (configuration, SQLite snapshots, socket I/O) is
//! collected here.

use thiserror::Error;
use trackgraph_core::GraphError;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File or socket I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph rule violation
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Stored snapshot does not decode into graph state
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Convenience Result type using the service Error
pub type Result<T> = std::result::Result<T, Error>;
