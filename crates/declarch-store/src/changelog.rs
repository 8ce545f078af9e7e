//! Append-only changelog of change events.
//!
//! One JSON object per line. Each event's fingerprint is written exactly once:
//! appends skip fingerprints already present in the file or earlier in the
//! same batch.
//!
//! Existing lines are never rewritten. An append computes the old bytes plus
//! the new lines and replaces the file atomically, so a crash leaves either
//! the old log or the new one. Lines that are not JSON, or carry no
//! fingerprint, are tolerated on load and carried over unchanged.

#![allow(clippy::result_large_err)]

use crate::atomic::PendingWrite;
use crate::errors::{io_error, Result};
use declarch_core::errors::{ExError, ExErrorKind};
use chrono::NaiveDate;
use declarch_core::ChangeEvent;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// What an append did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    pub appended: usize,
    pub skipped_duplicates: usize,
}

/// Computed append, not yet on disk
#[derive(Debug, Clone)]
pub struct PreparedAppend {
    /// Events that will be written, in input order
    pub events: Vec<ChangeEvent>,
    /// Events skipped because their fingerprint is already logged or
    /// repeated in the batch
    pub duplicates: Vec<ChangeEvent>,
    pub skipped_duplicates: usize,
    write: Option<PendingWrite>,
}

impl PreparedAppend {
    /// Whether committing would touch the file
    pub fn has_writes(&self) -> bool {
        self.write.is_some()
    }
}

/// The changelog file plus the fingerprints already in it
#[derive(Debug)]
pub struct ChangeLog {
    path: PathBuf,
    fingerprints: HashSet<String>,
    logged_dates: HashMap<String, NaiveDate>,
    skipped_lines: usize,
}

impl ChangeLog {
    /// Open the changelog at `path` and load its fingerprints.
    ///
    /// A missing file is an empty log; it is created by the first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Self {
            path: path.into(),
            fingerprints: HashSet::new(),
            logged_dates: HashMap::new(),
            skipped_lines: 0,
        };
        log.load_existing()?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the fingerprint set from disk.
    pub fn load_existing(&mut self) -> Result<&HashSet<String>> {
        let content = self.read_content("load_changelog")?;
        let mut fingerprints = HashSet::new();
        let mut logged_dates = HashMap::new();
        let mut skipped = 0;

        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => match value.get("fingerprint").and_then(Value::as_str) {
                    Some(fp) if !fp.is_empty() => {
                        if let Some(date) = value
                            .get("detectedDate")
                            .and_then(Value::as_str)
                            .and_then(|d| d.parse::<NaiveDate>().ok())
                        {
                            logged_dates.entry(fp.to_string()).or_insert(date);
                        }
                        fingerprints.insert(fp.to_string());
                    }
                    _ => {
                        tracing::warn!(line = idx + 1, "Changelog line has no fingerprint");
                        skipped += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "Skipping malformed changelog line");
                    skipped += 1;
                }
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            fingerprints = fingerprints.len(),
            skipped,
            "Loaded changelog"
        );
        self.fingerprints = fingerprints;
        self.logged_dates = logged_dates;
        self.skipped_lines = skipped;
        Ok(&self.fingerprints)
    }

    pub fn fingerprints(&self) -> &HashSet<String> {
        &self.fingerprints
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Detection date of the first logged line carrying `fingerprint`
    pub fn logged_on(&self, fingerprint: &str) -> Option<NaiveDate> {
        self.logged_dates.get(fingerprint).copied()
    }

    /// Lines skipped by the last load
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Decide which events are new and compute the resulting file.
    pub fn prepare_append(&self, events: &[ChangeEvent]) -> Result<PreparedAppend> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut fresh = Vec::new();
        let mut duplicates = Vec::new();

        for event in events {
            if self.fingerprints.contains(&event.fingerprint) || !seen.insert(event.fingerprint.as_str()) {
                tracing::debug!(
                    fingerprint = %event.fingerprint,
                    service_key = %event.service_key,
                    "Skipping duplicate change event"
                );
                duplicates.push(event.clone());
                continue;
            }
            fresh.push(event.clone());
        }

        let write = if fresh.is_empty() {
            None
        } else {
            let mut content = self.read_bytes("append_changelog")?;
            if !content.is_empty() && !content.ends_with(b"\n") {
                content.push(b'\n');
            }
            for event in &fresh {
                let line = serde_json::to_vec(event).map_err(|e| {
                    ExError::new(ExErrorKind::Serialization)
                        .with_op("append_changelog")
                        .with_entity_id(event.service_key.clone())
                        .with_message(e.to_string())
                })?;
                content.extend_from_slice(&line);
                content.push(b'\n');
            }
            Some(PendingWrite::new(self.path.clone(), content))
        };

        Ok(PreparedAppend {
            events: fresh,
            skipped_duplicates: duplicates.len(),
            duplicates,
            write,
        })
    }

    /// Write a prepared append and record its fingerprints.
    pub fn commit_append(&mut self, prepared: PreparedAppend) -> Result<AppendOutcome> {
        if let Some(write) = prepared.write {
            write.commit()?;
        }
        for event in &prepared.events {
            self.fingerprints.insert(event.fingerprint.clone());
            self.logged_dates
                .entry(event.fingerprint.clone())
                .or_insert(event.detected_date);
        }

        let outcome = AppendOutcome {
            appended: prepared.events.len(),
            skipped_duplicates: prepared.skipped_duplicates,
        };
        tracing::info!(
            path = %self.path.display(),
            appended = outcome.appended,
            skipped = outcome.skipped_duplicates,
            "Appended change events"
        );
        Ok(outcome)
    }

    /// Append every event whose fingerprint is not yet in the log.
    pub fn append(&mut self, events: &[ChangeEvent]) -> Result<AppendOutcome> {
        let prepared = self.prepare_append(events)?;
        self.commit_append(prepared)
    }

    /// Every well-formed event in file order, plus the number of lines that
    /// could not be decoded as an event.
    pub fn read_events(&self) -> Result<(Vec<ChangeEvent>, usize)> {
        let content = self.read_content("read_changelog")?;
        let mut events = Vec::new();
        let mut skipped = 0;
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match serde_json::from_str::<ChangeEvent>(line) {
                Ok(event) => events.push(event),
                Err(_) => skipped += 1,
            }
        }
        Ok((events, skipped))
    }

    fn read_bytes(&self, operation: &str) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_error(operation, &self.path, e)),
        }
    }

    fn read_content(&self, operation: &str) -> Result<String> {
        let bytes = self.read_bytes(operation)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
