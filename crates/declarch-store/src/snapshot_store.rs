//! Snapshot persistence.
//!
//! Two kinds of snapshot live in the data directory: the mutable latest
//! snapshot, replaced wholesale on every run, and dated snapshots, which only
//! ever accumulate records for services that changed on that date. Earlier
//! dated files are never touched.

#![allow(clippy::result_large_err)]

use crate::atomic::PendingWrite;
use crate::errors::{from_core, io_error, snapshot_not_found, Result};
use crate::layout::ArchiveLayout;
use chrono::NaiveDate;
use declarch_core::{ChangeEvent, Snapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Reads and writes snapshots under an [`ArchiveLayout`]
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: ArchiveLayout,
}

/// Result of merging into a dated snapshot, not yet on disk
#[derive(Debug, Clone)]
pub struct PreparedDatedMerge {
    pub date: NaiveDate,
    pub snapshot: Snapshot,
    /// Records taken from the current snapshot
    pub merged_keys: Vec<String>,
    /// `None` when the merge leaves the file byte-identical
    pub write: Option<PendingWrite>,
}

impl SnapshotStore {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Load the latest snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` when the file does not exist, `MalformedRecord` when it
    /// cannot be parsed.
    pub fn load_latest(&self) -> Result<Snapshot> {
        let path = self.layout.latest_path();
        match read_optional(&path, "load_latest")? {
            Some(bytes) => parse_snapshot(&bytes, &path.display().to_string()),
            None => Err(snapshot_not_found(&path)),
        }
    }

    /// Load the dated snapshot for `date`, `None` if there is none yet.
    pub fn load_dated(&self, date: NaiveDate) -> Result<Option<Snapshot>> {
        let path = self.layout.dated_path(date);
        read_optional(&path, "load_dated")?
            .map(|bytes| parse_snapshot(&bytes, &path.display().to_string()))
            .transpose()
    }

    /// Dates that have a dated snapshot, ascending.
    pub fn list_dated(&self) -> Result<Vec<NaiveDate>> {
        let dir = self.layout.dated_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list_dated", &dir, e)),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error("list_dated", &dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            match parsed {
                Some(date) => dates.push(date),
                None => tracing::debug!(path = %path.display(), "Ignoring non-dated file"),
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Compute the replacement for the latest snapshot.
    pub fn prepare_latest(&self, snapshot: &Snapshot) -> Result<PendingWrite> {
        let bytes = snapshot
            .to_json_bytes()
            .map_err(|e| from_core("prepare_latest", e))?;
        Ok(PendingWrite::new(self.layout.latest_path(), bytes))
    }

    /// Replace the latest snapshot atomically.
    pub fn save_latest(&self, snapshot: &Snapshot) -> Result<()> {
        self.prepare_latest(snapshot)?.commit()?;
        tracing::info!(
            path = %self.layout.latest_path().display(),
            record_count = snapshot.len(),
            "Saved latest snapshot"
        );
        Ok(())
    }

    /// Compute the dated snapshot for `date` after folding in the current
    /// record of every service named by `events`.
    ///
    /// Existing entries of the dated file are kept unless a changed service
    /// replaces them. Services absent from `current` (removals) contribute
    /// nothing.
    pub fn prepare_merge_dated(
        &self,
        date: NaiveDate,
        events: &[ChangeEvent],
        current: &Snapshot,
    ) -> Result<PreparedDatedMerge> {
        let path = self.layout.dated_path(date);
        let existing_bytes = read_optional(&path, "merge_dated")?;
        let mut merged = match &existing_bytes {
            Some(bytes) => parse_snapshot(bytes, &path.display().to_string())?,
            None => Snapshot::new(date),
        }
        .with_captured_date(date);

        let mut merged_keys = Vec::new();
        for event in events {
            if let Some(record) = current.get(&event.service_key) {
                merged.insert(record.clone());
                merged_keys.push(event.service_key.clone());
            }
        }

        let bytes = merged
            .to_json_bytes()
            .map_err(|e| from_core("merge_dated", e))?;
        let write = match existing_bytes {
            Some(existing) if existing == bytes => None,
            None if merged_keys.is_empty() => None,
            _ => Some(PendingWrite::new(path, bytes)),
        };

        Ok(PreparedDatedMerge {
            date,
            snapshot: merged,
            merged_keys,
            write,
        })
    }

    /// Write a prepared merge. Returns whether a file was written.
    pub fn commit_dated(&self, prepared: PreparedDatedMerge) -> Result<bool> {
        match prepared.write {
            Some(write) => {
                write.commit()?;
                tracing::info!(
                    date = %prepared.date,
                    record_count = prepared.snapshot.len(),
                    merged = prepared.merged_keys.len(),
                    "Merged dated snapshot"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Merge changed services into the dated snapshot for `date` and write it.
    pub fn merge_dated(
        &self,
        date: NaiveDate,
        events: &[ChangeEvent],
        current: &Snapshot,
    ) -> Result<Snapshot> {
        let prepared = self.prepare_merge_dated(date, events, current)?;
        let snapshot = prepared.snapshot.clone();
        self.commit_dated(prepared)?;
        Ok(snapshot)
    }
}

/// Parse snapshot bytes read from `origin`.
pub fn parse_snapshot(bytes: &[u8], origin: &str) -> Result<Snapshot> {
    Snapshot::from_json_bytes(bytes, origin).map_err(|e| from_core("parse_snapshot", e))
}

fn read_optional(path: &Path, operation: &str) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(operation, path, e)),
    }
}
