//! Versioned schema migrations with a persistent ledger.
//!
//! Each migration guards on ledger membership first, probes the live schema
//! second (so databases created or half-migrated by other builds are
//! absorbed without touching data), performs its effect third, and records
//! itself last. Re-running the full sequence on a current database is a
//! no-op; a partially-migrated database resumes from the first unapplied
//! version.

mod helpers;
mod rebuild;
mod v10;
mod v4;
mod v7;
mod v9;

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::StorageError;
use helpers::{add_column_if_not_exists, column_is_notnull, has_unique_index, table_exists};
use rebuild::{TableRebuild, rebuild_table};

/// First ledgered version. A fresh database bootstraps the whole base
/// schema here instead of replaying earlier history.
const BASE_VERSION: i32 = 4;

/// Latest schema version.
pub const SCHEMA_VERSION: i32 = 14;

/// Runs every unapplied migration. Must complete before any other
/// component issues a query.
pub(crate) fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    run_migrations_up_to(conn, SCHEMA_VERSION)
}

/// Applies unapplied migrations up to `target` inclusive. Split out so
/// tests can stop partway and resume.
pub(crate) fn run_migrations_up_to(conn: &Connection, target: i32) -> Result<(), StorageError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "busy_timeout", 5000_i32)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    ensure_ledger(conn)?;

    for version in BASE_VERSION..=target {
        if is_applied(conn, version)? {
            continue;
        }
        apply(conn, version)?;
    }

    tracing::info!(target, "database schema up to date");
    Ok(())
}

fn apply(conn: &Connection, version: i32) -> Result<(), StorageError> {
    match version {
        4 => fatal(conn, 4, migrate_v4),
        5 => soft(conn, 5, migrate_v5),
        6 => soft(conn, 6, migrate_v6),
        7 => fatal(conn, 7, migrate_v7),
        8 => soft(conn, 8, migrate_v8),
        9 => fatal(conn, 9, migrate_v9),
        10 => fatal(conn, 10, migrate_v10),
        11 => soft(conn, 11, migrate_v11),
        12 => soft(conn, 12, migrate_v12),
        13 => soft(conn, 13, migrate_v13),
        14 => soft(conn, 14, migrate_v14),
        _ => Ok(()),
    }
}

/// Rebuild-class migrations abort startup on failure: the transaction has
/// rolled back and there is no safe partially-rebuilt state to continue
/// from.
fn fatal(
    conn: &Connection,
    version: i32,
    step: fn(&Connection) -> rusqlite::Result<()>,
) -> Result<(), StorageError> {
    step(conn).map_err(|source| StorageError::Migration { version, source })?;
    record_applied(conn, version)?;
    Ok(())
}

/// Additive migrations fail soft: log and continue startup. The ledger row
/// is only written on success, so a failed step is retried next startup.
fn soft(
    conn: &Connection,
    version: i32,
    step: fn(&Connection) -> rusqlite::Result<()>,
) -> Result<(), StorageError> {
    match step(conn) {
        Ok(()) => record_applied(conn, version)?,
        Err(e) => {
            tracing::warn!(version, error = %e, "additive migration failed, continuing");
        },
    }
    Ok(())
}

fn ensure_ledger(conn: &Connection) -> Result<(), StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_versions (
            id INTEGER PRIMARY KEY,
            version INTEGER UNIQUE NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

fn is_applied(conn: &Connection, version: i32) -> Result<bool, StorageError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM schema_versions WHERE version = ?1",
        params![version],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn record_applied(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_versions (version, applied_at) VALUES (?1, ?2)",
        params![version, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// v4: base schema bootstrap (sessions, observations, session_summaries).
fn migrate_v4(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v4: base schema");
    conn.execute_batch(v4::SQL)
}

/// v5: worker_port column on sessions.
fn migrate_v5(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v5: worker_port column");
    add_column_if_not_exists(conn, "sessions", "worker_port", "INTEGER")
}

/// v6: prompt tracking columns.
fn migrate_v6(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v6: prompt tracking columns");
    add_column_if_not_exists(conn, "sessions", "prompt_counter", "INTEGER DEFAULT 0")?;
    add_column_if_not_exists(conn, "observations", "prompt_number", "INTEGER")?;
    add_column_if_not_exists(conn, "session_summaries", "prompt_number", "INTEGER")
}

/// v7: drop the UNIQUE constraint on session_summaries.memory_session_id
/// so a session can accumulate one summary per summarization pass.
fn migrate_v7(conn: &Connection) -> rusqlite::Result<()> {
    if !has_unique_index(conn, "session_summaries") {
        // Constraint already gone, nothing to rebuild.
        return Ok(());
    }
    tracing::info!("running migration v7: drop summary UNIQUE constraint");
    rebuild_table(
        conn,
        &TableRebuild {
            table: "session_summaries",
            create_shadow_sql: v7::SHADOW_SQL,
            columns: v7::COLUMNS,
            index_sql: v7::INDEX_SQL,
        },
    )
}

/// v8: hierarchical observation fields.
fn migrate_v8(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v8: hierarchical observation fields");
    for column in ["title", "subtitle", "facts", "narrative", "concepts", "files_read", "files_modified"]
    {
        add_column_if_not_exists(conn, "observations", column, "TEXT")?;
    }
    Ok(())
}

/// v9: make observations.text nullable (superseded by the hierarchical
/// fields) and admit 'change' in the type CHECK.
fn migrate_v9(conn: &Connection) -> rusqlite::Result<()> {
    if !column_is_notnull(conn, "observations", "text") {
        // Already nullable, or the column never existed.
        return Ok(());
    }
    tracing::info!("running migration v9: make observations.text nullable");
    rebuild_table(
        conn,
        &TableRebuild {
            table: "observations",
            create_shadow_sql: v9::SHADOW_SQL,
            columns: v9::COLUMNS,
            index_sql: v9::INDEX_SQL,
        },
    )
}

/// v10: user_prompts table with its FTS5 mirror and sync triggers.
fn migrate_v10(conn: &Connection) -> rusqlite::Result<()> {
    if table_exists(conn, "user_prompts") {
        return Ok(());
    }
    tracing::info!("running migration v10: user_prompts table with FTS5");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(v10::SQL)?;
    tx.commit()
}

/// v11: discovery_tokens columns for ROI tracking.
fn migrate_v11(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v11: discovery_tokens columns");
    add_column_if_not_exists(conn, "observations", "discovery_tokens", "INTEGER DEFAULT 0")?;
    add_column_if_not_exists(conn, "session_summaries", "discovery_tokens", "INTEGER DEFAULT 0")
}

/// v12: tool_use_id correlation column. Not unique: one tool invocation
/// may yield several observations.
fn migrate_v12(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v12: tool_use_id column");
    add_column_if_not_exists(conn, "observations", "tool_use_id", "TEXT")?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_observations_tool_use ON observations(tool_use_id)",
        [],
    )?;
    Ok(())
}

/// v13: endless-mode token accounting on sessions.
fn migrate_v13(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v13: endless token counters");
    for column in ["endless_original_tokens", "endless_compressed_tokens", "endless_tokens_saved"] {
        add_column_if_not_exists(conn, "sessions", column, "INTEGER DEFAULT 0")?;
    }
    Ok(())
}

/// v14: composite indexes for the project-scoped timeline queries.
fn migrate_v14(conn: &Connection) -> rusqlite::Result<()> {
    tracing::info!("running migration v14: composite indexes");
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_observations_project_created
             ON observations(project, created_at_epoch);
         CREATE INDEX IF NOT EXISTS idx_session_summaries_project_created
             ON session_summaries(project, created_at_epoch);
         CREATE INDEX IF NOT EXISTS idx_sessions_content_status
             ON sessions(content_session_id, status);",
    )
}
