use mnemo_core::SortOrder;

use super::{create_test_storage, set_epoch, test_summary_input};

#[test]
fn store_and_get_round_trips_fields() {
    let (storage, _temp_dir) = create_test_storage();
    let record = storage
        .store_summary("m-1", "proj", &test_summary_input("add caching"), Some(2), 120)
        .unwrap();

    let summary = storage.get_summary(record.id).unwrap().unwrap();
    assert_eq!(summary.memory_session_id, "m-1");
    assert_eq!(summary.request.as_deref(), Some("add caching"));
    assert_eq!(summary.files_read, vec!["src/lib.rs".to_owned()]);
    assert_eq!(summary.files_edited, vec!["src/store.rs".to_owned()]);
    assert_eq!(summary.prompt_number, Some(2));
    assert_eq!(summary.discovery_tokens, 120);
    assert!(summary.investigated.is_none());
}

#[test]
fn store_auto_creates_session_row() {
    let (storage, _temp_dir) = create_test_storage();
    storage.store_summary("m-new", "proj", &test_summary_input("req"), None, 0).unwrap();
    assert!(storage.find_any_session("m-new").unwrap().is_some());
}

#[test]
fn latest_summary_wins() {
    let (storage, _temp_dir) = create_test_storage();
    let first = storage.store_summary("m-1", "proj", &test_summary_input("first"), Some(1), 0).unwrap();
    let second = storage.store_summary("m-1", "proj", &test_summary_input("second"), Some(2), 0).unwrap();
    set_epoch(&storage, "session_summaries", first.id, 1000);
    set_epoch(&storage, "session_summaries", second.id, 2000);

    let latest = storage.get_latest_summary_for_session("m-1").unwrap().unwrap();
    assert_eq!(latest.request.as_deref(), Some("second"));

    assert!(storage.get_latest_summary_for_session("m-none").unwrap().is_none());
}

#[test]
fn recents_are_project_scoped_and_capped() {
    let (storage, _temp_dir) = create_test_storage();
    for i in 1..=3 {
        let record = storage
            .store_summary("m-a", "proj-a", &test_summary_input(&format!("a-{i}")), None, 0)
            .unwrap();
        set_epoch(&storage, "session_summaries", record.id, i * 100);
    }
    storage.store_summary("m-b", "proj-b", &test_summary_input("b-1"), None, 0).unwrap();

    let recents = storage.get_recent_summaries("proj-a", 2).unwrap();
    assert_eq!(recents.len(), 2);
    assert_eq!(recents[0].request.as_deref(), Some("a-3"));

    let all = storage.get_all_recent_summaries(10).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn get_by_ids_respects_order() {
    let (storage, _temp_dir) = create_test_storage();
    let mut ids = Vec::new();
    for i in 1..=3 {
        let record = storage
            .store_summary("m-1", "proj", &test_summary_input(&format!("s-{i}")), None, 0)
            .unwrap();
        set_epoch(&storage, "session_summaries", record.id, i * 100);
        ids.push(record.id);
    }

    let ascending = storage.get_summaries_by_ids(&ids, SortOrder::Asc, 10).unwrap();
    assert_eq!(ascending[0].request.as_deref(), Some("s-1"));
    assert_eq!(ascending[2].request.as_deref(), Some("s-3"));

    assert!(storage.get_summaries_by_ids(&[], SortOrder::Asc, 10).unwrap().is_empty());
}
