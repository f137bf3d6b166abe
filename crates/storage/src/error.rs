//! Typed error enum for the storage layer.
//!
//! Callers match on specific failure modes (open failure, migration
//! failure, SQL errors, corrupt rows) instead of downcasting opaque boxes.

use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

/// Storage-layer error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database file or its parent directory could not be created.
    /// Startup-blocking.
    #[error("failed to open database at {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Connection pool failure (build or checkout).
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// SQL execution or query failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A schema migration failed. For rebuild migrations the transaction
    /// has already been rolled back; startup must not continue.
    #[error("migration v{version} failed: {source}")]
    Migration {
        version: i32,
        #[source]
        source: rusqlite::Error,
    },

    /// Row data could not be decoded into its domain type.
    #[error("corrupt row data: {context}")]
    DataCorruption {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::DataCorruption {
            context: "JSON column encoding".to_owned(),
            source: Box::new(err),
        }
    }
}

pub type Result<T> = StdResult<T, StorageError>;
