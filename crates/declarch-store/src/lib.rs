//! declarch Store - persistence for snapshots and the changelog
//!
//! Provides:
//! - Atomic temp→rename writes with prepared (two-phase) mutations
//! - `SnapshotStore` for the mutable latest snapshot and per-date snapshots
//! - `ChangeLog`, the append-only de-duplicated JSONL event log
//! - The `HistoryReader` capability with git and in-memory implementations

pub mod atomic;
pub mod changelog;
pub mod errors;
pub mod history;
pub mod layout;
pub mod snapshot_store;

// Re-export key types
pub use changelog::{AppendOutcome, ChangeLog, PreparedAppend};
pub use errors::Result;
pub use history::{GitHistoryReader, HistoryReader, MemoryHistory};
pub use layout::ArchiveLayout;
pub use snapshot_store::{PreparedDatedMerge, SnapshotStore};
