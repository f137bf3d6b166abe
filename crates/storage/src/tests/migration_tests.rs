use rusqlite::Connection;
use tempfile::TempDir;

use super::{create_test_storage, test_summary_input};
use crate::migrations::{SCHEMA_VERSION, run_migrations, run_migrations_up_to};

fn ledger_versions(conn: &Connection) -> Vec<i32> {
    let mut stmt = conn.prepare("SELECT version FROM schema_versions ORDER BY version").unwrap();
    stmt.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect()
}

fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})")).unwrap();
    let mut names: Vec<String> =
        stmt.query_map([], |row| row.get(1)).unwrap().map(Result::unwrap).collect();
    names.sort();
    names
}

fn table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect()
}

#[test]
fn fresh_database_records_every_version() {
    let (storage, _temp_dir) = create_test_storage();
    let conn = storage.pool.get().unwrap();
    let expected: Vec<i32> = (4..=SCHEMA_VERSION).collect();
    assert_eq!(ledger_versions(&conn), expected);
}

#[test]
fn rerunning_migrations_is_a_noop() {
    let (storage, _temp_dir) = create_test_storage();
    let conn = storage.pool.get().unwrap();

    let versions_before = ledger_versions(&conn);
    let observations_before = column_names(&conn, "observations");
    let sessions_before = column_names(&conn, "sessions");
    let tables_before = table_names(&conn);

    run_migrations(&conn).unwrap();

    assert_eq!(ledger_versions(&conn), versions_before);
    assert_eq!(column_names(&conn, "observations"), observations_before);
    assert_eq!(column_names(&conn, "sessions"), sessions_before);
    assert_eq!(table_names(&conn), tables_before);
}

#[test]
fn partial_migration_resumes_to_same_schema() {
    // One database stopped at v9, then resumed to current.
    let resumed_dir = TempDir::new().unwrap();
    let resumed_path = resumed_dir.path().join("resumed.db");
    {
        let conn = Connection::open(&resumed_path).unwrap();
        run_migrations_up_to(&conn, 9).unwrap();
        assert_eq!(ledger_versions(&conn), vec![4, 5, 6, 7, 8, 9]);
        assert!(!table_names(&conn).contains(&"user_prompts".to_owned()));
    }
    let resumed = Connection::open(&resumed_path).unwrap();
    run_migrations(&resumed).unwrap();

    // A second database migrated in one pass.
    let fresh_dir = TempDir::new().unwrap();
    let fresh = Connection::open(fresh_dir.path().join("fresh.db")).unwrap();
    run_migrations(&fresh).unwrap();

    assert_eq!(ledger_versions(&resumed), ledger_versions(&fresh));
    for table in ["sessions", "observations", "session_summaries", "user_prompts"] {
        assert_eq!(column_names(&resumed, table), column_names(&fresh, table), "{table}");
    }
}

#[test]
fn summary_uniqueness_is_dropped() {
    let (storage, _temp_dir) = create_test_storage();
    storage.store_summary("m-1", "proj", &test_summary_input("first"), Some(1), 0).unwrap();
    storage.store_summary("m-1", "proj", &test_summary_input("second"), Some(2), 0).unwrap();

    let conn = storage.pool.get().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM session_summaries WHERE memory_session_id = 'm-1'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn observation_text_is_nullable_and_change_type_admitted() {
    let (storage, _temp_dir) = create_test_storage();
    // Parent row for the FK.
    storage.store_observation("m-legacy", "proj", &super::test_observation_input("seed"), None, 0).unwrap();

    let conn = storage.pool.get().unwrap();
    conn.execute(
        "INSERT INTO observations
           (memory_session_id, project, text, type, created_at, created_at_epoch)
         VALUES ('m-legacy', 'proj', NULL, 'change', '2026-01-01T00:00:00Z', 1000)",
        [],
    )
    .unwrap();
}

#[test]
fn observation_type_check_rejects_unknown_kind() {
    let (storage, _temp_dir) = create_test_storage();
    storage.store_observation("m-1", "proj", &super::test_observation_input("seed"), None, 0).unwrap();

    let conn = storage.pool.get().unwrap();
    let result = conn.execute(
        "INSERT INTO observations
           (memory_session_id, project, text, type, created_at, created_at_epoch)
         VALUES ('m-1', 'proj', 'x', 'gotcha', '2026-01-01T00:00:00Z', 1000)",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn ledger_rejects_duplicate_version_rows() {
    let (storage, _temp_dir) = create_test_storage();
    let conn = storage.pool.get().unwrap();
    // INSERT OR IGNORE is how migrations record themselves; a plain insert
    // of a recorded version must violate the UNIQUE constraint.
    let result = conn.execute(
        "INSERT INTO schema_versions (version, applied_at) VALUES (4, '2026-01-01T00:00:00Z')",
        [],
    );
    assert!(result.is_err());
}
