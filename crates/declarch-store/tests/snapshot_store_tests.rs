// Integration tests for latest and dated snapshot persistence

mod common;

use common::{date, detect, key_of, service, snapshot};
use declarch_core::errors::ExErrorKind;
use declarch_store::{ArchiveLayout, SnapshotStore};
use std::fs;
use tempfile::TempDir;

fn setup_store() -> (TempDir, SnapshotStore) {
    let dir = TempDir::new().expect("Failed to create temp data directory");
    let store = SnapshotStore::new(ArchiveLayout::new(dir.path()));
    (dir, store)
}

#[test]
fn test_load_latest_missing_is_not_found() {
    let (_dir, store) = setup_store();

    let err = store.load_latest().unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_save_then_load_latest() {
    let (_dir, store) = setup_store();
    let snap = snapshot(vec![service("a", "compliant"), service("b", "partial")])
        .with_captured_date(date("2025-03-01"));

    store.save_latest(&snap).unwrap();

    assert_eq!(store.load_latest().unwrap(), snap);
}

#[test]
fn test_malformed_latest_is_reported() {
    let (dir, store) = setup_store();
    fs::write(dir.path().join("latest.json"), b"{\"urls\": 3}").unwrap();

    let err = store.load_latest().unwrap_err();

    assert_eq!(err.kind(), ExErrorKind::MalformedRecord);
}

#[test]
fn test_merge_dated_adds_only_changed_services() {
    let (_dir, store) = setup_store();
    let baseline = snapshot(vec![service("a", "compliant"), service("b", "compliant")]);
    let current = snapshot(vec![service("a", "compliant"), service("b", "partial")]);
    let events = detect(&baseline, &current, "2025-03-01");

    let dated = store.merge_dated(date("2025-03-01"), &events, &current).unwrap();

    assert_eq!(dated.len(), 1);
    assert!(dated.contains_key(&key_of("b")));
    assert_eq!(dated.captured_date(), Some(date("2025-03-01")));
    assert_eq!(store.load_dated(date("2025-03-01")).unwrap(), Some(dated));
}

#[test]
fn test_merge_dated_keeps_earlier_entries_same_day() {
    let (_dir, store) = setup_store();
    let day = date("2025-03-01");

    let first = snapshot(vec![service("a", "partial")]);
    let events = detect(&snapshot(vec![]), &first, "2025-03-01");
    store.merge_dated(day, &events, &first).unwrap();

    let second = snapshot(vec![service("a", "partial"), service("b", "compliant")]);
    let events = detect(&first, &second, "2025-03-01");
    let dated = store.merge_dated(day, &events, &second).unwrap();

    let keys: Vec<&String> = dated.keys().collect();
    assert_eq!(keys, vec![&key_of("a"), &key_of("b")]);
}

#[test]
fn test_removed_services_not_folded_in() {
    let (_dir, store) = setup_store();
    let baseline = snapshot(vec![service("gone", "compliant")]);
    let current = snapshot(vec![]);
    let events = detect(&baseline, &current, "2025-03-01");
    assert_eq!(events.len(), 1);

    let prepared = store
        .prepare_merge_dated(date("2025-03-01"), &events, &current)
        .unwrap();

    assert!(prepared.snapshot.is_empty());
    assert!(prepared.write.is_none());
    assert!(!store.commit_dated(prepared).unwrap());
    assert!(store.list_dated().unwrap().is_empty());
}

#[test]
fn test_earlier_dated_snapshot_untouched() {
    let (dir, store) = setup_store();
    let day_one = snapshot(vec![service("a", "partial")]);
    let events = detect(&snapshot(vec![]), &day_one, "2025-03-01");
    store.merge_dated(date("2025-03-01"), &events, &day_one).unwrap();
    let yesterday = dir.path().join("snapshots").join("2025-03-01.json");
    let before = fs::read(&yesterday).unwrap();

    let day_two = snapshot(vec![service("a", "compliant")]);
    let events = detect(&day_one, &day_two, "2025-03-02");
    store.merge_dated(date("2025-03-02"), &events, &day_two).unwrap();

    assert_eq!(fs::read(&yesterday).unwrap(), before);
    assert_eq!(
        store.list_dated().unwrap(),
        vec![date("2025-03-01"), date("2025-03-02")]
    );
}

#[test]
fn test_repeat_merge_is_not_rewritten() {
    let (_dir, store) = setup_store();
    let current = snapshot(vec![service("a", "partial")]);
    let events = detect(&snapshot(vec![]), &current, "2025-03-01");
    store.merge_dated(date("2025-03-01"), &events, &current).unwrap();

    let prepared = store
        .prepare_merge_dated(date("2025-03-01"), &events, &current)
        .unwrap();

    assert!(prepared.write.is_none());
}

#[test]
fn test_list_dated_ignores_foreign_files() {
    let (dir, store) = setup_store();
    let dated_dir = dir.path().join("snapshots");
    fs::create_dir_all(&dated_dir).unwrap();
    fs::write(dated_dir.join("2025-03-02.json"), b"[]").unwrap();
    fs::write(dated_dir.join("2025-03-01.json"), b"[]").unwrap();
    fs::write(dated_dir.join("notes.json"), b"[]").unwrap();
    fs::write(dated_dir.join("2025-03-03.txt"), b"").unwrap();

    assert_eq!(
        store.list_dated().unwrap(),
        vec![date("2025-03-01"), date("2025-03-02")]
    );
}
