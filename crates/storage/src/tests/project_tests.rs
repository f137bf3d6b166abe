use super::{create_test_storage, test_observation_input, test_summary_input};

#[test]
fn list_projects_unions_sessions_and_observations() {
    let (storage, _temp_dir) = create_test_storage();
    storage.create_or_get_session("c-1", "proj-b", "prompt").unwrap();
    storage.store_observation("m-1", "proj-a", &test_observation_input("obs"), None, 0).unwrap();
    storage.store_observation("m-2", "proj-b", &test_observation_input("obs"), None, 0).unwrap();

    let projects = storage.list_projects().unwrap();
    assert_eq!(projects, vec!["proj-a".to_owned(), "proj-b".to_owned()]);
}

#[test]
fn recent_sessions_report_summary_state_oldest_first() {
    let (storage, _temp_dir) = create_test_storage();

    let first = storage.create_or_get_session("c-1", "proj", "first").unwrap();
    storage.assign_memory_session_id(first, "m-1").unwrap();
    let second = storage.create_or_get_session("c-2", "proj", "second").unwrap();
    storage.assign_memory_session_id(second, "m-2").unwrap();
    // No memory id yet: invisible to the overview.
    storage.create_or_get_session("c-3", "proj", "third").unwrap();

    let conn = storage.pool.get().unwrap();
    conn.execute("UPDATE sessions SET started_at_epoch = 1000 WHERE id = ?1", [first]).unwrap();
    conn.execute("UPDATE sessions SET started_at_epoch = 2000 WHERE id = ?1", [second]).unwrap();
    drop(conn);

    storage.store_summary("m-2", "proj", &test_summary_input("req"), None, 0).unwrap();

    let overview = storage.get_recent_sessions_with_status("proj", 10).unwrap();
    assert_eq!(overview.len(), 2);
    assert_eq!(overview[0].memory_session_id.as_deref(), Some("m-1"));
    assert!(!overview[0].has_summary);
    assert_eq!(overview[1].memory_session_id.as_deref(), Some("m-2"));
    assert!(overview[1].has_summary);
}

#[test]
fn recent_sessions_cap_keeps_newest() {
    let (storage, _temp_dir) = create_test_storage();
    for i in 1..=4_i64 {
        let id = storage
            .create_or_get_session(&format!("c-{i}"), "proj", "prompt")
            .unwrap();
        storage.assign_memory_session_id(id, &format!("m-{i}")).unwrap();
        let conn = storage.pool.get().unwrap();
        conn.execute(
            "UPDATE sessions SET started_at_epoch = ?1 WHERE id = ?2",
            rusqlite::params![i * 1000, id],
        )
        .unwrap();
    }

    let overview = storage.get_recent_sessions_with_status("proj", 2).unwrap();
    assert_eq!(overview.len(), 2);
    // Newest two, presented oldest first.
    assert_eq!(overview[0].memory_session_id.as_deref(), Some("m-3"));
    assert_eq!(overview[1].memory_session_id.as_deref(), Some("m-4"));
}

#[test]
fn stats_count_all_tables() {
    let (storage, _temp_dir) = create_test_storage();
    let stats = storage.get_stats().unwrap();
    assert_eq!(stats.session_count, 0);
    assert_eq!(stats.observation_count, 0);

    storage.store_observation("m-1", "proj-a", &test_observation_input("obs"), None, 0).unwrap();
    storage.store_summary("m-1", "proj-a", &test_summary_input("req"), None, 0).unwrap();
    storage.store_prompt("c-1", "proj-b", 1, "prompt").unwrap();

    let stats = storage.get_stats().unwrap();
    assert_eq!(stats.session_count, 2);
    assert_eq!(stats.observation_count, 1);
    assert_eq!(stats.summary_count, 1);
    assert_eq!(stats.prompt_count, 1);
    assert_eq!(stats.project_count, 2);
}
