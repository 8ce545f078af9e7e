//! Baseline resolution.
//!
//! A run compares the current snapshot against exactly one baseline. Where
//! that baseline comes from depends on [`BaselineMode`]:
//!
//! - `Local`: the latest file in the data directory. A missing file is a
//!   first run and yields an empty baseline.
//! - `ExplicitRef(rev)`: the latest file as committed at `rev`.
//! - `DefaultHead`: the latest file at `HEAD`. Never committed is a first
//!   run, like a missing local file.
//! - `AutoBacktrack { max_steps }`: `HEAD`, `HEAD~1`, ... `HEAD~(max_steps-1)`,
//!   first one that exists and parses.
//!
//! Failures here are fatal for the run and happen before any write.

#![allow(clippy::result_large_err)]

use crate::config::{BaselineMode, DEFAULT_BASELINE_REF};
use declarch_core::errors::{DeclarchError, ExError, ExErrorKind};
use declarch_core::Snapshot;
use declarch_store::snapshot_store::parse_snapshot;
use declarch_store::{HistoryReader, Result, SnapshotStore};
use std::time::Instant;

/// Where a baseline came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineSource {
    /// The local latest file
    LocalLatest,
    /// No local latest file yet; empty baseline
    FirstRun,
    /// A committed version of the latest file
    Revision { revision: String, steps_back: u32 },
}

impl std::fmt::Display for BaselineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineSource::LocalLatest => f.write_str("local latest"),
            BaselineSource::FirstRun => f.write_str("first run (empty)"),
            BaselineSource::Revision { revision, .. } => write!(f, "revision {}", revision),
        }
    }
}

/// The snapshot to diff against, with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub source: BaselineSource,
    pub snapshot: Snapshot,
}

/// Selects the baseline for a run
pub struct BaselineResolver<'a> {
    store: &'a SnapshotStore,
    history: &'a dyn HistoryReader,
    history_path: String,
}

impl<'a> BaselineResolver<'a> {
    /// `history_path` is the latest file's path inside the repository that
    /// `history` reads from.
    pub fn new(
        store: &'a SnapshotStore,
        history: &'a dyn HistoryReader,
        history_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            history,
            history_path: history_path.into(),
        }
    }

    pub fn history_path(&self) -> &str {
        &self.history_path
    }

    /// Resolve the baseline for `mode`.
    ///
    /// # Errors
    ///
    /// - `BaselineMissing`: the file is absent at an explicit revision
    /// - `BaselineExhausted`: no usable revision within the backtrack budget
    /// - `MalformedRecord`: the local file, an explicit revision or `HEAD`
    ///   does not parse
    /// - `Io` / `ExternalService`: the store or history backend failed
    pub fn resolve(&self, mode: &BaselineMode) -> Result<Baseline> {
        let start = Instant::now();
        declarch_core::log_op_start!("resolve_baseline", mode = %mode);

        let result = match mode {
            BaselineMode::Local => self.resolve_local(),
            BaselineMode::ExplicitRef(rev) => self.resolve_ref(rev),
            BaselineMode::DefaultHead => self.resolve_default_head(),
            BaselineMode::AutoBacktrack { max_steps } => self.resolve_backtrack(*max_steps),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(baseline) => {
                declarch_core::log_op_end!(
                    "resolve_baseline",
                    duration_ms = duration_ms,
                    source = %baseline.source,
                    record_count = baseline.snapshot.len()
                );
                Ok(baseline)
            }
            Err(err) => {
                declarch_core::log_op_error!("resolve_baseline", err.clone(), duration_ms = duration_ms);
                Err(err)
            }
        }
    }

    fn resolve_local(&self) -> Result<Baseline> {
        match self.store.load_latest() {
            Ok(snapshot) => Ok(Baseline {
                source: BaselineSource::LocalLatest,
                snapshot,
            }),
            Err(err) if err.kind() == ExErrorKind::NotFound => {
                tracing::info!("No local latest snapshot; starting from an empty baseline");
                Ok(Baseline {
                    source: BaselineSource::FirstRun,
                    snapshot: Snapshot::empty(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn resolve_ref(&self, revision: &str) -> Result<Baseline> {
        let snapshot = self.read_revision(revision)?.ok_or_else(|| {
            ExError::from(DeclarchError::BaselineMissing {
                revision: revision.to_string(),
                path: self.history_path.clone(),
            })
            .with_op("resolve_baseline")
        })?;

        Ok(Baseline {
            source: BaselineSource::Revision {
                revision: revision.to_string(),
                steps_back: 0,
            },
            snapshot,
        })
    }

    fn resolve_default_head(&self) -> Result<Baseline> {
        match self.read_revision(DEFAULT_BASELINE_REF)? {
            Some(snapshot) => Ok(Baseline {
                source: BaselineSource::Revision {
                    revision: DEFAULT_BASELINE_REF.to_string(),
                    steps_back: 0,
                },
                snapshot,
            }),
            None => {
                tracing::info!(
                    path = %self.history_path,
                    "Latest snapshot never committed; starting from an empty baseline"
                );
                Ok(Baseline {
                    source: BaselineSource::FirstRun,
                    snapshot: Snapshot::empty(),
                })
            }
        }
    }

    /// Parsed snapshot at `revision`, `None` if the file is absent there.
    fn read_revision(&self, revision: &str) -> Result<Option<Snapshot>> {
        self.history
            .read_at_revision(revision, &self.history_path)?
            .map(|bytes| parse_snapshot(&bytes, &self.origin(revision)))
            .transpose()
    }

    fn resolve_backtrack(&self, max_steps: u32) -> Result<Baseline> {
        for step in 0..max_steps {
            let revision = backtrack_revision(step);
            let Some(bytes) = self.history.read_at_revision(&revision, &self.history_path)? else {
                tracing::debug!(revision = %revision, "Baseline absent at revision");
                continue;
            };
            match parse_snapshot(&bytes, &self.origin(&revision)) {
                Ok(snapshot) => {
                    tracing::info!(revision = %revision, steps_back = step, "Baseline found");
                    return Ok(Baseline {
                        source: BaselineSource::Revision {
                            revision,
                            steps_back: step,
                        },
                        snapshot,
                    });
                }
                Err(err) => {
                    tracing::warn!(revision = %revision, err = %err, "Unusable baseline, walking back");
                }
            }
        }

        Err(ExError::from(DeclarchError::BaselineExhausted {
            steps: max_steps,
            path: self.history_path.clone(),
        })
        .with_op("resolve_baseline"))
    }

    fn origin(&self, revision: &str) -> String {
        format!("{}:{}", revision, self.history_path)
    }
}

/// `HEAD` for step 0, `HEAD~n` after that
pub fn backtrack_revision(step: u32) -> String {
    if step == 0 {
        "HEAD".to_string()
    } else {
        format!("HEAD~{}", step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtrack_revision_names() {
        assert_eq!(backtrack_revision(0), "HEAD");
        assert_eq!(backtrack_revision(1), "HEAD~1");
        assert_eq!(backtrack_revision(9), "HEAD~9");
    }
}
