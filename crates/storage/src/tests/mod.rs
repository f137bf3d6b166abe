//! Test fixtures and module declarations for storage tests.

use std::sync::Arc;

use mnemo_core::{ObservationInput, ObservationType, SummaryInput};
use tempfile::TempDir;

use crate::Storage;
use crate::diagnostics::CapturingDiagnostics;

mod migration_tests;
mod project_tests;
mod summary_tests;
mod timeline_tests;

pub fn create_test_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let storage = Storage::open(&db_path).unwrap();
    (storage, temp_dir)
}

pub fn create_capturing_storage() -> (Storage, Arc<CapturingDiagnostics>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let diagnostics = Arc::new(CapturingDiagnostics::default());
    let storage =
        Storage::open_with_diagnostics(&temp_dir.path().join("test.db"), diagnostics.clone())
            .unwrap();
    (storage, diagnostics, temp_dir)
}

pub fn test_observation_input(title: &str) -> ObservationInput {
    ObservationInput::builder(ObservationType::Discovery, title)
        .subtitle("test subtitle")
        .narrative("test narrative")
        .facts(vec!["fact-1".to_owned(), "fact-2".to_owned()])
        .concepts(vec!["how-it-works".to_owned()])
        .files_read(vec!["src/lib.rs".to_owned()])
        .files_modified(vec!["src/store.rs".to_owned()])
        .build()
}

pub fn test_summary_input(request: &str) -> SummaryInput {
    SummaryInput {
        request: Some(request.to_owned()),
        learned: Some("learned something".to_owned()),
        completed: Some("completed something".to_owned()),
        files_read: vec!["src/lib.rs".to_owned()],
        files_edited: vec!["src/store.rs".to_owned()],
        ..SummaryInput::default()
    }
}

/// Stores an observation then pins its epoch, so timeline tests control
/// the clock. Insertion order must follow epoch order for id-anchored
/// scans to see consistent data.
pub fn insert_observation_at(
    storage: &Storage,
    memory_session_id: &str,
    project: &str,
    epoch: i64,
) -> i64 {
    let record = storage
        .store_observation(
            memory_session_id,
            project,
            &test_observation_input(&format!("obs at {epoch}")),
            None,
            0,
        )
        .unwrap();
    set_epoch(storage, "observations", record.id, epoch);
    record.id
}

pub fn set_epoch(storage: &Storage, table: &str, id: i64, epoch: i64) {
    let conn = storage.pool.get().unwrap();
    conn.execute(
        &format!("UPDATE {table} SET created_at_epoch = ?1 WHERE id = ?2"),
        rusqlite::params![epoch, id],
    )
    .unwrap();
}
