use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use serde_json::json;
use state_store::{
    replay_sessions, EventKind, InstanceId, SessionPatch, StateVolume, StoreError,
};
use tempfile::TempDir;

fn open_volume() -> (TempDir, StateVolume) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let volume = StateVolume::open(dir.path(), InstanceId::new("0000test")).expect("volume opens");
    (dir, volume)
}

fn kinds_for(volume: &StateVolume, session_id: &str) -> Vec<EventKind> {
    volume
        .log()
        .read(usize::MAX)
        .expect("log should be readable")
        .map(|entry| entry.expect("entry should parse"))
        .filter(|entry| entry.event.session_id() == Some(session_id))
        .map(|entry| entry.kind())
        .collect()
}

#[test]
fn create_persists_fresh_session_and_counts_it() {
    let (_dir, volume) = open_volume();

    let session = volume
        .registry()
        .create("alpha", json!({"k": 1}))
        .expect("create should succeed");

    assert_eq!(session.name, "alpha");
    assert_eq!(session.data, json!({"k": 1}));
    assert_eq!(session.access_count, 0);
    assert_eq!(session.created_at, session.last_active);
    assert!(volume.layout().session_file(&session.id).exists());
    assert_eq!(volume.registry().get(&session.id).expect("get"), session);
    assert_eq!(
        volume.counters().snapshot().expect("snapshot").total_sessions,
        1
    );
}

#[test]
fn lifecycle_example_updates_then_deletes() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();

    let created = registry
        .create("alpha", json!({"k": 1}))
        .expect("create should succeed");
    let updated = registry
        .update(&created.id, SessionPatch::data(json!({"k": 2})))
        .expect("update should succeed");
    assert_eq!(updated.access_count, 1);
    assert_eq!(updated.name, "alpha");
    assert_eq!(updated.data, json!({"k": 2}));

    registry.delete(&created.id).expect("delete should succeed");
    let remaining = registry
        .list()
        .expect("list should succeed")
        .collect_all()
        .expect("records should parse");
    assert!(remaining.iter().all(|session| session.id != created.id));

    assert_eq!(
        kinds_for(&volume, &created.id),
        vec![
            EventKind::SessionCreated,
            EventKind::SessionUpdated,
            EventKind::SessionDeleted,
        ]
    );
}

#[test]
fn update_with_only_name_keeps_payload() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let created = registry
        .create("alpha", json!({"nested": {"keep": true}}))
        .expect("create should succeed");

    let updated = registry
        .update(&created.id, SessionPatch::name("beta"))
        .expect("update should succeed");

    assert_eq!(updated.name, "beta");
    assert_eq!(updated.data, created.data);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.access_count, created.access_count + 1);
    assert!(updated.last_active >= created.last_active);
}

#[test]
fn update_replaces_payload_wholesale() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let created = registry
        .create("alpha", json!({"a": 1, "b": 2}))
        .expect("create should succeed");

    let updated = registry
        .update(&created.id, SessionPatch::data(json!({"c": 3})))
        .expect("update should succeed");

    assert_eq!(updated.data, json!({"c": 3}));
}

#[test]
fn empty_patch_still_touches_the_session() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let created = registry.create("alpha", json!({})).expect("create");

    let updated = registry
        .update(&created.id, SessionPatch::default())
        .expect("update should succeed");

    assert_eq!(updated.name, "alpha");
    assert_eq!(updated.access_count, 1);
}

#[test]
fn missing_sessions_are_not_found() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let absent = "00000000-0000-4000-8000-000000000000";

    assert!(matches!(
        registry.get(absent),
        Err(StoreError::SessionNotFound { .. })
    ));
    assert!(matches!(
        registry.update(absent, SessionPatch::name("x")),
        Err(StoreError::SessionNotFound { .. })
    ));
    assert!(matches!(
        registry.delete(absent),
        Err(StoreError::SessionNotFound { .. })
    ));
}

#[test]
fn ids_that_are_not_uuids_never_touch_the_filesystem() {
    let (_dir, volume) = open_volume();
    volume.record_startup().expect("startup writes stats.json");

    // Joined naively this would resolve to the counters file.
    let error = volume
        .registry()
        .get("../stats")
        .expect_err("path-like id must fail");
    assert!(matches!(error, StoreError::SessionNotFound { .. }));
}

#[test]
fn delete_then_get_is_not_found() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let session = registry.create("alpha", json!({})).expect("create");

    registry.delete(&session.id).expect("delete");

    let error = registry.get(&session.id).expect_err("deleted session");
    assert!(error.is_not_found());
    assert!(matches!(
        registry.delete(&session.id),
        Err(StoreError::SessionNotFound { .. })
    ));
}

#[test]
fn corrupt_session_file_is_surfaced() {
    let (_dir, volume) = open_volume();
    let session = volume.registry().create("alpha", json!({})).expect("create");
    fs::write(volume.layout().session_file(&session.id), "{\"id\":").expect("corrupt");

    let error = volume.registry().get(&session.id).expect_err("corrupt record");
    assert!(matches!(error, StoreError::Corrupt { .. }));
}

#[test]
fn listing_is_a_sorted_restartable_snapshot() {
    let (_dir, volume) = open_volume();
    let registry = volume.registry();
    let mut expected = (0..3)
        .map(|index| {
            registry
                .create(format!("s{index}"), json!({}))
                .expect("create")
                .id
        })
        .collect::<Vec<_>>();
    expected.sort();

    let listing = registry.list().expect("list should succeed");
    registry.create("late", json!({})).expect("create after listing");

    let first_pass = listing
        .iter()
        .map(|session| session.expect("parse").id)
        .collect::<Vec<_>>();
    let second_pass = listing
        .iter()
        .map(|session| session.expect("parse").id)
        .collect::<Vec<_>>();
    assert_eq!(listing.len(), 3);
    assert_eq!(first_pass, expected);
    assert_eq!(second_pass, expected);
}

#[test]
fn listing_skips_orphan_temp_files() {
    let (_dir, volume) = open_volume();
    let session = volume.registry().create("alpha", json!({})).expect("create");
    let sessions_dir = volume.layout().sessions_dir();
    fs::write(sessions_dir.join(format!(".{}.json.deadbeef.tmp", session.id)), "{")
        .expect("orphan should be written");

    let listed = volume
        .registry()
        .list()
        .expect("list")
        .collect_all()
        .expect("orphans must not be parsed");
    assert_eq!(listed.len(), 1);
}

#[test]
fn concurrent_updates_to_one_session_are_not_lost() {
    let (_dir, volume) = open_volume();
    let volume = Arc::new(volume);
    let session = volume.registry().create("alpha", json!({})).expect("create");

    let handles = (0..8)
        .map(|worker| {
            let volume = Arc::clone(&volume);
            let id = session.id.clone();
            std::thread::spawn(move || {
                for _ in 0..10 {
                    volume
                        .registry()
                        .update(&id, SessionPatch::data(json!({"worker": worker})))
                        .expect("update should succeed");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    let stored = volume.registry().get(&session.id).expect("get");
    assert_eq!(stored.access_count, 80);
}

#[test]
fn concurrent_creates_count_every_session() {
    let (_dir, volume) = open_volume();
    let volume = Arc::new(volume);

    let handles = (0..4)
        .map(|worker| {
            let volume = Arc::clone(&volume);
            std::thread::spawn(move || {
                for index in 0..10 {
                    volume
                        .registry()
                        .create(format!("w{worker}-{index}"), json!({}))
                        .expect("create should succeed");
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    let counters = volume.counters().snapshot().expect("snapshot");
    assert_eq!(counters.total_sessions, 40);
    assert_eq!(volume.registry().list().expect("list").len(), 40);
}

#[test]
fn disk_state_matches_replayed_log_across_restarts() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut kept: Vec<String> = Vec::new();

    for round in 0..3 {
        let volume = StateVolume::open(dir.path(), InstanceId::generate()).expect("volume opens");
        volume.record_startup().expect("startup");
        let registry = volume.registry();

        let a = registry.create(format!("a{round}"), json!({})).expect("create");
        let b = registry.create(format!("b{round}"), json!({})).expect("create");
        registry
            .update(&a.id, SessionPatch::name("renamed"))
            .expect("update");
        registry.delete(&b.id).expect("delete");
        if let Some(previous) = kept.pop() {
            registry.delete(&previous).expect("delete from earlier run");
        }
        kept.push(a.id);
    }

    let volume = StateVolume::open(dir.path(), InstanceId::generate()).expect("volume opens");
    let on_disk = volume
        .registry()
        .list()
        .expect("list")
        .iter()
        .map(|session| session.expect("parse").id)
        .collect::<BTreeSet<_>>();
    let replayed = replay_sessions(volume.log().read(usize::MAX).expect("read")).expect("replay");

    assert_eq!(on_disk, replayed);
    assert_eq!(on_disk.len(), 1);
}
