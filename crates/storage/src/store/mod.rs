//! SQLite store implementation.
//!
//! One file-backed database behind an r2d2 connection pool. All methods
//! are synchronous; the schema is migrated to current before the pool
//! serves any other query.

mod observations;
mod projects;
mod prompts;
mod sessions;
mod summaries;
mod timeline;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mnemo_core::env_parse_with_default;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::diagnostics::{DiagnosticsSink, TracingDiagnostics};
use crate::error::{Result, StorageError};
use crate::migrations;

pub use projects::StorageStats;

/// Type alias for pooled connection
pub(crate) type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Handle to the memory database: a connection pool plus the diagnostics
/// sink anomalies are reported through.
#[derive(Clone)]
pub struct Storage {
    pub(crate) pool: Pool<SqliteConnectionManager>,
    pub(crate) diagnostics: Arc<dyn DiagnosticsSink>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("pool", &self.pool).finish_non_exhaustive()
    }
}

/// Get a connection from the pool
pub(crate) fn get_conn(pool: &Pool<SqliteConnectionManager>) -> Result<PooledConn> {
    pool.get().map_err(StorageError::Pool)
}

/// Parse JSON from string, converting error to rusqlite error
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> rusqlite::Result<T> {
    serde_json::from_str(s).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Decode a nullable JSON-array column into a string list. Rows written
/// before the column existed carry NULL and decode to empty.
pub(crate) fn parse_json_list(value: Option<String>) -> rusqlite::Result<Vec<String>> {
    match value {
        Some(s) => parse_json(&s),
        None => Ok(Vec::new()),
    }
}

/// Parse an RFC 3339 column, converting error to rusqlite error
pub(crate) fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Log row read errors and filter them out
pub(crate) fn log_row_error<T>(result: rusqlite::Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("row read error: {}", e);
            None
        },
    }
}

/// Coerce a reference to a `ToSql` trait object (for IN-list parameters)
pub(crate) fn coerce_to_sql<T: rusqlite::ToSql>(val: &T) -> &dyn rusqlite::ToSql {
    val
}

/// Wall-clock stamp as the pair every table persists: RFC 3339 text plus
/// epoch milliseconds.
pub(crate) fn now_stamp() -> (String, i64) {
    let now = Utc::now();
    (now.to_rfc3339(), now.timestamp_millis())
}

/// Connection initializer: concurrency pragmas plus FK cascade enforcement.
fn init_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA busy_timeout = 30000;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(())
}

fn db_pool_size() -> u32 {
    env_parse_with_default("MNEMO_DB_POOL_SIZE", 8)
}

impl Storage {
    /// Opens (creating if needed) the database at `db_path`, migrates the
    /// schema to current and returns a pooled handle. Anomalies are
    /// reported through `tracing`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or a fatal migration
    /// fails; neither state is safe to continue from.
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_with_diagnostics(db_path, Arc::new(TracingDiagnostics))
    }

    /// Like [`Storage::open`] with an injected diagnostics sink, so tests
    /// and embedding services can capture defensive-default emissions.
    ///
    /// # Errors
    /// Same failure modes as [`Storage::open`].
    pub fn open_with_diagnostics(
        db_path: &Path,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Result<Self> {
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| StorageError::Open {
                    path: db_path.to_path_buf(),
                    source: Box::new(e),
                })?;
            }
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(init_connection);
        let pool_size = db_pool_size();
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        // Migrations must finish before the pool serves anything else.
        let conn = pool.get().map_err(StorageError::Pool)?;
        migrations::run_migrations(&conn)?;
        drop(conn);

        tracing::info!(pool_size, path = %db_path.display(), "storage initialized");

        Ok(Self { pool, diagnostics })
    }

    /// Substitutes the typed default for an unexpectedly absent value and
    /// reports the substitution through the diagnostics sink. Control flow
    /// is never affected; the emission is the observable part.
    pub(crate) fn expect_with_diagnostic<T: Default>(
        &self,
        value: Option<T>,
        context: &'static str,
        detail: &str,
    ) -> T {
        match value {
            Some(v) => v,
            None => {
                self.diagnostics.emit(context, detail);
                T::default()
            },
        }
    }
}
