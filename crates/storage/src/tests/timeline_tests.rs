use std::collections::HashMap;

use super::{create_test_storage, insert_observation_at, set_epoch, test_summary_input};
use crate::Storage;
use tempfile::TempDir;

/// Eight observations at epochs 1000..=8000 in one project. Returns ids
/// keyed by epoch.
fn seed_observations(storage: &Storage) -> HashMap<i64, i64> {
    (1..=8)
        .map(|i| {
            let epoch = i * 1000;
            (epoch, insert_observation_at(storage, "m-tl", "proj", epoch))
        })
        .collect()
}

fn window_epochs(storage: &Storage, anchor_id: i64, before: usize, after: usize) -> Vec<i64> {
    let window = storage.timeline_around_observation(anchor_id, before, after, None).unwrap();
    window.observations.iter().map(|obs| obs.created_at_epoch).collect()
}

fn seeded() -> (Storage, HashMap<i64, i64>, TempDir) {
    let (storage, temp_dir) = create_test_storage();
    let ids = seed_observations(&storage);
    (storage, ids, temp_dir)
}

#[test]
fn window_spans_two_on_each_side_of_anchor() {
    let (storage, ids, _temp_dir) = seeded();
    let epochs = window_epochs(&storage, ids[&5000], 2, 2);
    assert_eq!(epochs, vec![3000, 4000, 5000, 6000, 7000]);
}

#[test]
fn window_is_ascending_and_contains_anchor() {
    let (storage, ids, _temp_dir) = seeded();
    let epochs = window_epochs(&storage, ids[&4000], 3, 1);
    assert!(epochs.windows(2).all(|w| w[0] <= w[1]));
    assert!(epochs.contains(&4000));
    assert_eq!(epochs, vec![1000, 2000, 3000, 4000, 5000]);
}

#[test]
fn backward_boundary_degrades_at_oldest_row() {
    let (storage, ids, _temp_dir) = seeded();
    // Nothing earlier than 1000: the backward boundary is the anchor
    // itself, not an error.
    let epochs = window_epochs(&storage, ids[&1000], 2, 2);
    assert_eq!(epochs, vec![1000, 2000, 3000]);
}

#[test]
fn forward_boundary_degrades_at_newest_row() {
    let (storage, ids, _temp_dir) = seeded();
    let epochs = window_epochs(&storage, ids[&8000], 2, 2);
    assert_eq!(epochs, vec![6000, 7000, 8000]);
}

#[test]
fn empty_database_yields_empty_window() {
    let (storage, _temp_dir) = create_test_storage();

    let by_id = storage.timeline_around_observation(1, 5, 5, None).unwrap();
    assert!(by_id.observations.is_empty());
    assert!(by_id.summaries.is_empty());
    assert!(by_id.prompts.is_empty());

    let by_epoch = storage.timeline_around_epoch(5000, 5, 5, None).unwrap();
    assert!(by_epoch.observations.is_empty());
    assert!(by_epoch.summaries.is_empty());
    assert!(by_epoch.prompts.is_empty());
}

#[test]
fn epoch_anchor_matches_id_anchor() {
    let (storage, _ids, _temp_dir) = seeded();
    let window = storage.timeline_around_epoch(5000, 2, 2, None).unwrap();
    let epochs: Vec<i64> = window.observations.iter().map(|o| o.created_at_epoch).collect();
    assert_eq!(epochs, vec![3000, 4000, 5000, 6000, 7000]);
}

#[test]
fn epoch_anchor_between_rows_windows_nearest_neighbors() {
    let (storage, _ids, _temp_dir) = seeded();
    let window = storage.timeline_around_epoch(4500, 1, 1, None).unwrap();
    let epochs: Vec<i64> = window.observations.iter().map(|o| o.created_at_epoch).collect();
    assert_eq!(epochs, vec![3000, 4000, 5000, 6000]);
}

#[test]
fn project_filter_excludes_other_projects() {
    let (storage, _temp_dir) = create_test_storage();
    let mut anchor_id = 0;
    for (i, (project, session)) in [
        ("proj-a", "m-a"),
        ("proj-b", "m-b"),
        ("proj-a", "m-a"),
        ("proj-b", "m-b"),
        ("proj-a", "m-a"),
        ("proj-b", "m-b"),
        ("proj-a", "m-a"),
    ]
    .iter()
    .enumerate()
    {
        let epoch = (i as i64 + 1) * 500;
        let id = insert_observation_at(&storage, session, project, epoch);
        if epoch == 1500 {
            anchor_id = id;
        }
    }

    let window = storage.timeline_around_observation(anchor_id, 1, 1, Some("proj-a")).unwrap();
    assert!(window.observations.iter().all(|obs| obs.project == "proj-a"));
    let epochs: Vec<i64> = window.observations.iter().map(|o| o.created_at_epoch).collect();
    assert_eq!(epochs, vec![500, 1500, 2500]);
}

#[test]
fn project_filter_matching_nothing_yields_empty_window() {
    let (storage, ids, _temp_dir) = seeded();
    let window = storage.timeline_around_observation(ids[&5000], 2, 2, Some("proj-other")).unwrap();
    assert!(window.observations.is_empty());
    assert!(window.summaries.is_empty());
    assert!(window.prompts.is_empty());
}

#[test]
fn summaries_and_prompts_inside_range_are_included() {
    let (storage, ids, _temp_dir) = seeded();

    let inside = storage.store_summary("m-tl", "proj", &test_summary_input("inside"), None, 0).unwrap();
    set_epoch(&storage, "session_summaries", inside.id, 4500);
    let outside = storage.store_summary("m-tl", "proj", &test_summary_input("outside"), None, 0).unwrap();
    set_epoch(&storage, "session_summaries", outside.id, 9500);

    // Prompts hang off the placeholder session created for m-tl.
    let in_prompt = storage.store_prompt("m-tl", "proj", 1, "inside prompt").unwrap();
    set_epoch(&storage, "user_prompts", in_prompt.id, 6500);
    let out_prompt = storage.store_prompt("m-tl", "proj", 2, "outside prompt").unwrap();
    set_epoch(&storage, "user_prompts", out_prompt.id, 100);

    let window = storage.timeline_around_observation(ids[&5000], 2, 2, Some("proj")).unwrap();

    assert_eq!(window.summaries.len(), 1);
    assert_eq!(window.summaries[0].request.as_deref(), Some("inside"));
    assert_eq!(window.prompts.len(), 1);
    assert_eq!(window.prompts[0].prompt_text, "inside prompt");
}

#[test]
fn single_row_database_windows_onto_itself() {
    let (storage, _temp_dir) = create_test_storage();
    let only = insert_observation_at(&storage, "m-1", "proj", 5000);

    let window = storage.timeline_around_observation(only, 3, 3, None).unwrap();
    let epochs: Vec<i64> = window.observations.iter().map(|o| o.created_at_epoch).collect();
    assert_eq!(epochs, vec![5000]);
}
