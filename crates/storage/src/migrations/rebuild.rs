//! Shadow-table rebuild for constraint changes SQLite cannot ALTER in
//! place (dropping a UNIQUE constraint, relaxing NOT NULL, widening a
//! CHECK).

use rusqlite::Connection;

pub(super) struct TableRebuild<'a> {
    pub table: &'a str,
    /// CREATE TABLE statement producing `{table}_new` with the target
    /// shape.
    pub create_shadow_sql: &'a str,
    /// Explicit column list copied across. Named columns, never SELECT *,
    /// so the copy tolerates column reordering between builds.
    pub columns: &'a [&'a str],
    /// Statements recreating the secondary indexes the original carried.
    pub index_sql: &'a str,
}

/// Create shadow, copy rows, drop original, rename, reindex, all inside one
/// transaction. Any failure rolls the whole rebuild back and the error
/// propagates to the caller.
pub(super) fn rebuild_table(conn: &Connection, plan: &TableRebuild<'_>) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(plan.create_shadow_sql)?;

    let columns = plan.columns.join(", ");
    tx.execute(
        &format!(
            "INSERT INTO {table}_new ({columns}) SELECT {columns} FROM {table}",
            table = plan.table
        ),
        [],
    )?;
    tx.execute(&format!("DROP TABLE {}", plan.table), [])?;
    tx.execute(
        &format!("ALTER TABLE {table}_new RENAME TO {table}", table = plan.table),
        [],
    )?;
    tx.execute_batch(plan.index_sql)?;
    tx.commit()
}
