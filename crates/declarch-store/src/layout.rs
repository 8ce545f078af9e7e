//! On-disk layout of an archive data directory.
//!
//! ```text
//! <data_dir>/latest.json               mutable latest snapshot
//! <data_dir>/snapshots/YYYY-MM-DD.json dated snapshots
//! <data_dir>/logs/changes.jsonl        changelog
//! ```

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const LATEST_FILE: &str = "latest.json";
pub const DATED_DIR: &str = "snapshots";
pub const LOGS_DIR: &str = "logs";
pub const CHANGELOG_FILE: &str = "changes.jsonl";

/// Paths of one archive data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    data_dir: PathBuf,
}

impl ArchiveLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.data_dir.join(LATEST_FILE)
    }

    pub fn dated_dir(&self) -> PathBuf {
        self.data_dir.join(DATED_DIR)
    }

    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.dated_dir()
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.data_dir.join(LOGS_DIR).join(CHANGELOG_FILE)
    }
}
