//! Atomic write primitives
//!
//! Uses temp→rename so readers never observe a partial file. Writes can be
//! prepared up front as [`PendingWrite`] values and committed later, which
//! lets a caller validate every mutation before touching disk.

#![allow(clippy::result_large_err)]

use crate::errors::{io_error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file
///
/// The temp file lives next to the target so the rename stays on one
/// filesystem. On any failure the temp file is removed and the target is
/// left as it was.
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", parent, e))?;
    }

    let temp_path = temp_path_for(target_path);
    let mut guard = TempFileGuard::new(temp_path.clone());

    {
        let mut file =
            File::create(&temp_path).map_err(|e| io_error("create_temp", &temp_path, e))?;
        file.write_all(content)
            .map_err(|e| io_error("write_temp", &temp_path, e))?;
        file.sync_all()
            .map_err(|e| io_error("sync_temp", &temp_path, e))?;
    }

    fs::rename(&temp_path, target_path).map_err(|e| io_error("rename_temp", target_path, e))?;
    guard.disarm();

    tracing::trace!(path = %target_path.display(), bytes = content.len(), "Atomic write complete");
    Ok(())
}

/// `<name>.tmp` in the target's directory
fn temp_path_for(target_path: &Path) -> PathBuf {
    let mut name = target_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target_path.with_file_name(name)
}

struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// A fully computed file replacement that has not been written yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWrite {
    path: PathBuf,
    content: Vec<u8>,
}

impl PendingWrite {
    pub fn new(path: impl Into<PathBuf>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Write the content atomically
    pub fn commit(self) -> Result<()> {
        atomic_write(&self.path, &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_files(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|s| s.ends_with(".tmp"))
                    .unwrap_or(false)
            })
            .count()
    }

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("latest.json");

        atomic_write(&target, b"hello").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("logs").join("changes.jsonl");

        atomic_write(&target, b"nested").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"nested");
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("latest.json");
        fs::write(&target, b"old").unwrap();

        atomic_write(&target, b"new").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(tmp_files(temp_dir.path()), 0);
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A directory in the target's place makes the rename fail
        let target = temp_dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();

        assert!(atomic_write(&target, b"data").is_err());
        assert_eq!(tmp_files(temp_dir.path()), 0);
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_temp_name_keeps_extension() {
        assert_eq!(
            temp_path_for(Path::new("/d/changes.jsonl")),
            PathBuf::from("/d/changes.jsonl.tmp")
        );
    }

    #[test]
    fn test_pending_write_commit() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("snapshots").join("2025-03-01.json");
        let pending = PendingWrite::new(&target, b"{}\n".to_vec());

        assert!(!target.exists());
        pending.commit().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{}\n");
    }
}
