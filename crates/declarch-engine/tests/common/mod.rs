#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use declarch_core::{DeclarationRecord, Snapshot};
use declarch_store::{ArchiveLayout, SnapshotStore};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const HISTORY_PATH: &str = "data/latest.json";

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn at(day: &str) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date(day).and_hms_opt(6, 0, 0).unwrap())
}

pub fn service(name: &str, status: &str) -> DeclarationRecord {
    DeclarationRecord::new(format!("https://{}.example/", name))
        .with_title(format!("Service {}", name))
        .with_status(status)
}

pub fn snapshot(records: Vec<DeclarationRecord>) -> Snapshot {
    Snapshot::from_records(None, records)
}

pub fn bytes(snap: &Snapshot) -> Vec<u8> {
    snap.to_json_bytes().unwrap()
}

pub fn key_of(name: &str) -> String {
    format!("url::https://{}.example/", name)
}

pub fn setup_store() -> (TempDir, SnapshotStore) {
    let dir = TempDir::new().expect("Failed to create temp data directory");
    let store = SnapshotStore::new(ArchiveLayout::new(dir.path()));
    (dir, store)
}

/// Every file under `dir`, relative, sorted
pub fn list_files(dir: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else { return };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                out.push(path.strip_prefix(root).unwrap().display().to_string());
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

pub fn log_lines(dir: &Path) -> usize {
    fs::read_to_string(dir.join("logs").join("changes.jsonl"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
