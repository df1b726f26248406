use std::fs;
use std::path::PathBuf;

use serde_json::{json, Value};
use state_store::{RecordStore, StoreError};
use tempfile::TempDir;

fn record_path(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join(name);
    (dir, path)
}

fn temp_siblings(dir: &TempDir) -> Vec<String> {
    fs::read_dir(dir.path())
        .expect("dir should be listable")
        .map(|entry| {
            entry
                .expect("entry should be readable")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .filter(|name| name.ends_with(".tmp"))
        .collect()
}

#[test]
fn read_missing_record_is_not_found() {
    let (_dir, path) = record_path("absent.json");

    let error = RecordStore::new()
        .read::<Value>(&path)
        .expect_err("missing record must fail");
    assert!(matches!(error, StoreError::NotFound { .. }));
    assert!(error.is_not_found());
}

#[test]
fn read_optional_maps_missing_to_none() {
    let (_dir, path) = record_path("absent.json");

    let value = RecordStore::new()
        .read_optional::<Value>(&path)
        .expect("missing record is not an error");
    assert!(value.is_none());
}

#[test]
fn read_unparseable_record_is_corrupt() {
    let (_dir, path) = record_path("broken.json");
    fs::write(&path, "{ \"half\": ").expect("fixture should be written");

    let error = RecordStore::new()
        .read::<Value>(&path)
        .expect_err("truncated json must fail");
    assert!(matches!(error, StoreError::Corrupt { .. }));
    assert!(error.is_corrupt());
    assert_eq!(
        fs::read_to_string(&path).expect("fixture should remain"),
        "{ \"half\": ",
        "corrupt content must not be repaired or discarded"
    );
}

#[test]
fn write_replaces_record_and_leaves_no_temp_files() {
    let (dir, path) = record_path("value.json");
    let store = RecordStore::new();

    store.write(&path, &json!({"k": 1})).expect("first write");
    store.write(&path, &json!({"k": 2})).expect("second write");

    let value: Value = store.read(&path).expect("read back");
    assert_eq!(value, json!({"k": 2}));
    assert!(temp_siblings(&dir).is_empty());
}

#[test]
fn staged_write_is_invisible_until_commit() {
    let (_dir, path) = record_path("value.json");
    let store = RecordStore::new();
    store.write(&path, &json!({"v": "old"})).expect("seed write");

    let staged = store.stage(&path, &json!({"v": "new"})).expect("stage");
    assert!(staged.temp_path().exists());
    assert_eq!(staged.destination(), path.as_path());

    let before: Value = store.read(&path).expect("read before commit");
    assert_eq!(before, json!({"v": "old"}));

    staged.commit().expect("commit");
    let after: Value = store.read(&path).expect("read after commit");
    assert_eq!(after, json!({"v": "new"}));
}

#[test]
fn dropped_staged_write_cleans_up_and_keeps_prior_value() {
    let (dir, path) = record_path("value.json");
    let store = RecordStore::new();
    store.write(&path, &json!({"v": "old"})).expect("seed write");

    drop(store.stage(&path, &json!({"v": "new"})).expect("stage"));

    let value: Value = store.read(&path).expect("read");
    assert_eq!(value, json!({"v": "old"}));
    assert!(temp_siblings(&dir).is_empty());
}

#[test]
fn kill_between_write_and_rename_keeps_prior_value() {
    let (dir, path) = record_path("value.json");
    let store = RecordStore::new();
    store.write(&path, &json!({"v": "old"})).expect("seed write");

    // A leaked staged write is what a process killed before the rename leaves behind.
    let staged = store.stage(&path, &json!({"v": "new"})).expect("stage");
    let orphan = staged.temp_path().to_path_buf();
    std::mem::forget(staged);

    let value: Value = store.read(&path).expect("read");
    assert_eq!(value, json!({"v": "old"}));
    assert!(orphan.exists());
    assert_eq!(temp_siblings(&dir).len(), 1);

    store.write(&path, &json!({"v": "newer"})).expect("later write");
    let value: Value = store.read(&path).expect("read");
    assert_eq!(value, json!({"v": "newer"}));
}

#[test]
fn failed_temp_write_leaves_destination_untouched() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("missing-parent").join("value.json");

    let error = RecordStore::new()
        .write(&path, &json!({"k": 1}))
        .expect_err("write into a missing directory must fail");
    assert!(matches!(error, StoreError::WriteFailure { .. }));
    assert!(!path.exists());
}

#[test]
fn remove_missing_record_is_not_found() {
    let (_dir, path) = record_path("absent.json");

    let error = RecordStore::new()
        .remove(&path)
        .expect_err("removing a missing record must fail");
    assert!(matches!(error, StoreError::NotFound { .. }));
}

#[test]
fn concurrent_readers_never_observe_partial_records() {
    let (_dir, path) = record_path("value.json");
    let store = RecordStore::new();
    let filler = "x".repeat(64 * 1024);
    store
        .write(&path, &json!({"round": 0, "filler": filler}))
        .expect("seed write");

    std::thread::scope(|scope| {
        let writer_path = path.clone();
        let writer_filler = filler.clone();
        scope.spawn(move || {
            for round in 1..=50 {
                store
                    .write(&writer_path, &json!({"round": round, "filler": writer_filler}))
                    .expect("write round");
            }
        });

        for _ in 0..200 {
            let value: Value = store.read(&path).expect("reader must see a whole record");
            assert_eq!(value["filler"].as_str().map(str::len), Some(filler.len()));
        }
    });
}
