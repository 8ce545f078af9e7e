// Integration tests for the de-duplicated JSONL changelog

mod common;

use common::{date, detect, key_of, service, snapshot};
use declarch_store::ChangeLog;
use std::fs;
use tempfile::TempDir;

fn log_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("logs").join("changes.jsonl")
}

fn line_count(dir: &TempDir) -> usize {
    fs::read_to_string(log_path(dir))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

#[test]
fn test_missing_log_is_empty_and_not_created() {
    let dir = TempDir::new().unwrap();

    let log = ChangeLog::open(log_path(&dir)).unwrap();

    assert!(log.fingerprints().is_empty());
    assert!(!log_path(&dir).exists());
}

#[test]
fn test_append_writes_one_line_per_event() {
    let dir = TempDir::new().unwrap();
    let events = detect(
        &snapshot(vec![]),
        &snapshot(vec![service("a", "partial"), service("b", "compliant")]),
        "2025-03-01",
    );
    let mut log = ChangeLog::open(log_path(&dir)).unwrap();

    let outcome = log.append(&events).unwrap();

    assert_eq!(outcome.appended, 2);
    assert_eq!(outcome.skipped_duplicates, 0);
    assert_eq!(line_count(&dir), 2);
    assert_eq!(log.read_events().unwrap(), (events, 0));
}

#[test]
fn test_duplicate_fingerprints_are_skipped_across_runs() {
    let dir = TempDir::new().unwrap();
    let events = detect(&snapshot(vec![]), &snapshot(vec![service("a", "partial")]), "2025-03-01");
    ChangeLog::open(log_path(&dir)).unwrap().append(&events).unwrap();
    let before = fs::read(log_path(&dir)).unwrap();

    let mut reopened = ChangeLog::open(log_path(&dir)).unwrap();
    let outcome = reopened.append(&events).unwrap();

    assert_eq!(outcome.appended, 0);
    assert_eq!(outcome.skipped_duplicates, 1);
    assert_eq!(fs::read(log_path(&dir)).unwrap(), before);
}

#[test]
fn test_duplicates_within_one_batch() {
    let dir = TempDir::new().unwrap();
    let events = detect(&snapshot(vec![]), &snapshot(vec![service("a", "partial")]), "2025-03-01");
    let doubled = vec![events[0].clone(), events[0].clone()];
    let mut log = ChangeLog::open(log_path(&dir)).unwrap();

    let outcome = log.append(&doubled).unwrap();

    assert_eq!(outcome.appended, 1);
    assert_eq!(outcome.skipped_duplicates, 1);
}

#[test]
fn test_logged_on_keeps_first_detection_date() {
    let dir = TempDir::new().unwrap();
    let change = (snapshot(vec![]), snapshot(vec![service("a", "partial")]));
    let first = detect(&change.0, &change.1, "2025-03-01");
    let mut log = ChangeLog::open(log_path(&dir)).unwrap();
    log.append(&first).unwrap();
    assert_eq!(log.logged_on(&first[0].fingerprint), Some(date("2025-03-01")));

    let reopened = ChangeLog::open(log_path(&dir)).unwrap();
    let repeat = detect(&change.0, &change.1, "2025-03-04");
    let prepared = reopened.prepare_append(&repeat).unwrap();

    assert_eq!(repeat[0].fingerprint, first[0].fingerprint);
    assert_eq!(reopened.logged_on(&repeat[0].fingerprint), Some(date("2025-03-01")));
    assert!(prepared.events.is_empty());
    assert_eq!(prepared.duplicates, repeat);
    assert!(!prepared.has_writes());
    assert_eq!(reopened.logged_on("unknown"), None);
}

#[test]
fn test_malformed_lines_tolerated_and_preserved() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(log_path(&dir).parent().unwrap()).unwrap();
    let legacy = "{not json\n{\"kind\":\"modified\",\"url\":\"https://old.example/\"}\n{\"fingerprint\":\"abc\"}";
    fs::write(log_path(&dir), legacy).unwrap();

    let mut log = ChangeLog::open(log_path(&dir)).unwrap();
    assert_eq!(log.skipped_lines(), 2);
    assert!(log.contains("abc"));

    let events = detect(&snapshot(vec![]), &snapshot(vec![service("a", "partial")]), "2025-03-01");
    log.append(&events).unwrap();

    let content = fs::read_to_string(log_path(&dir)).unwrap();
    assert!(content.starts_with(legacy));
    assert_eq!(content.lines().count(), 4);
    assert!(content.ends_with('\n'));
}

#[test]
fn test_log_grows_monotonically() {
    let dir = TempDir::new().unwrap();
    let mut log = ChangeLog::open(log_path(&dir)).unwrap();

    let v1 = snapshot(vec![service("a", "partial")]);
    let v2 = snapshot(vec![service("a", "compliant")]);
    let v3 = snapshot(vec![service("a", "non-compliant")]);

    let mut previous = fs::read(log_path(&dir)).unwrap_or_default();
    for (before, after, day) in [
        (snapshot(vec![]), v1.clone(), "2025-03-01"),
        (v1, v2.clone(), "2025-03-02"),
        (v2, v3, "2025-03-03"),
    ] {
        log.append(&detect(&before, &after, day)).unwrap();
        let now = fs::read(log_path(&dir)).unwrap();
        assert!(now.starts_with(&previous));
        assert!(now.len() > previous.len());
        previous = now;
    }
    assert_eq!(line_count(&dir), 3);
}

#[test]
fn test_prepare_append_does_not_touch_disk() {
    let dir = TempDir::new().unwrap();
    let log = ChangeLog::open(log_path(&dir)).unwrap();
    let events = detect(&snapshot(vec![]), &snapshot(vec![service("a", "partial")]), "2025-03-01");

    let prepared = log.prepare_append(&events).unwrap();

    assert!(prepared.has_writes());
    assert_eq!(prepared.events.len(), 1);
    assert!(!log_path(&dir).exists());
    assert!(!log.contains(&events[0].fingerprint));
}

#[test]
fn test_read_events_counts_undecodable_lines() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(log_path(&dir).parent().unwrap()).unwrap();
    fs::write(log_path(&dir), "{\"fingerprint\":\"legacy\"}\n").unwrap();
    let mut log = ChangeLog::open(log_path(&dir)).unwrap();
    log.append(&detect(
        &snapshot(vec![]),
        &snapshot(vec![service("a", "partial"), service("b", "compliant")]),
        "2025-03-01",
    ))
    .unwrap();

    let (events, skipped) = log.read_events().unwrap();

    assert_eq!(skipped, 1);
    let keys: Vec<&str> = events.iter().map(|e| e.service_key.as_str()).collect();
    assert_eq!(keys, vec![key_of("a"), key_of("b")]);
}
