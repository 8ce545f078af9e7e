//! Read-only access to past versions of files.
//!
//! The baseline for change detection is the latest snapshot as it was at
//! some earlier revision. [`HistoryReader`] is the seam: production reads
//! from git, tests use [`MemoryHistory`].

#![allow(clippy::result_large_err)]

use crate::errors::{external_service, Result};
use declarch_core::errors::{ExError, ExErrorKind};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

/// Retrieves file contents at a named revision
pub trait HistoryReader {
    /// Bytes of `path` (relative to the repository root, `/`-separated) at
    /// `revision`, or `None` if the revision or the file does not exist there.
    ///
    /// # Errors
    ///
    /// Only for failures of the history backend itself, never for a missing
    /// revision or path.
    fn read_at_revision(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>>;
}

/// History backed by `git show <rev>:<path>`
#[derive(Debug, Clone)]
pub struct GitHistoryReader {
    repo_dir: PathBuf,
}

impl GitHistoryReader {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }
}

impl HistoryReader for GitHistoryReader {
    fn read_at_revision(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>> {
        validate_revision(revision)?;

        let object = format!("{}:{}", revision, path);
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .arg("show")
            .arg(&object)
            .output()
            .map_err(|e| {
                external_service("git_show", format!("failed to run git: {}", e))
                    .with_revision(revision)
                    .with_entity_id(path)
            })?;

        if output.status.success() {
            tracing::debug!(revision, path, bytes = output.stdout.len(), "Read file from history");
            Ok(Some(output.stdout))
        } else {
            tracing::debug!(
                revision,
                path,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "File not present at revision"
            );
            Ok(None)
        }
    }
}

/// Reject revisions git would parse as options.
fn validate_revision(revision: &str) -> Result<()> {
    if revision.trim().is_empty() || revision.starts_with('-') {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("git_show")
            .with_revision(revision)
            .with_message("revision must be non-empty and must not start with '-'"));
    }
    Ok(())
}

/// In-memory history: revision → path → bytes
///
/// Records every lookup so callers can assert how far a search went.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    files: HashMap<String, HashMap<String, Vec<u8>>>,
    lookups: Mutex<Vec<String>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file version at `revision`.
    pub fn with_file(
        mut self,
        revision: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.files
            .entry(revision.into())
            .or_default()
            .insert(path.into(), content.into());
        self
    }

    /// Revisions asked for so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

impl HistoryReader for MemoryHistory {
    fn read_at_revision(&self, revision: &str, path: &str) -> Result<Option<Vec<u8>>> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push(revision.to_string());
        }
        Ok(self
            .files
            .get(revision)
            .and_then(|files| files.get(path))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_history_lookup() {
        let history = MemoryHistory::new().with_file("HEAD~1", "data/latest.json", b"[]".to_vec());

        assert_eq!(
            history.read_at_revision("HEAD~1", "data/latest.json").unwrap(),
            Some(b"[]".to_vec())
        );
        assert_eq!(history.read_at_revision("HEAD", "data/latest.json").unwrap(), None);
        assert_eq!(history.read_at_revision("HEAD~1", "other.json").unwrap(), None);
        assert_eq!(history.lookups(), vec!["HEAD~1", "HEAD", "HEAD~1"]);
    }

    #[test]
    fn test_option_like_revision_rejected() {
        let reader = GitHistoryReader::new(".");
        let err = reader.read_at_revision("--output=x", "latest.json").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.revision(), Some("--output=x"));
    }
}
