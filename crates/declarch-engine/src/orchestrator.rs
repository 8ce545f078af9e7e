//! Archive run orchestration.
//!
//! ## State machine
//!
//! ```text
//! ResolveBaseline → Detect → DeduplicateAndLog → PersistSnapshots → Done
//!        └──────────────┴──────────┴──────────────────┴──────→ Failed
//! ```
//!
//! - Baseline failures stop the run before anything is written.
//! - With zero events `DeduplicateAndLog` is skipped and only the latest
//!   snapshot is rewritten.
//! - Otherwise the changelog append, the dated merge and the latest
//!   snapshot are all prepared first, then written in that order. Each write
//!   is atomic. If a later write fails the log already holds the events, and
//!   a re-run converges: the log skips known fingerprints and the dated
//!   merge is idempotent.
//! - The dated snapshot only receives events logged on the run's date, so
//!   a day that only repeats known changes gets no dated file.
//! - `dry_run` stops after `Detect` and writes nothing.

#![allow(clippy::result_large_err)]

use crate::baseline::{BaselineResolver, BaselineSource};
use crate::config::BaselineMode;
use chrono::{DateTime, NaiveDate, Utc};
use declarch_core::errors::ExError;
use declarch_core::{ChangeDetector, ChangeEvent, Snapshot};
use declarch_core_types::RunContext;
use declarch_store::{ChangeLog, HistoryReader, PreparedAppend, SnapshotStore};
use std::time::Instant;

/// Steps of one archive run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    ResolveBaseline,
    Detect,
    DeduplicateAndLog,
    PersistSnapshots,
    Done,
    Failed,
}

impl std::fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArchiveState::ResolveBaseline => "resolve_baseline",
            ArchiveState::Detect => "detect",
            ArchiveState::DeduplicateAndLog => "deduplicate_and_log",
            ArchiveState::PersistSnapshots => "persist_snapshots",
            ArchiveState::Done => "done",
            ArchiveState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-run options
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub mode: BaselineMode,
    /// Resolve and detect only; no writes
    pub dry_run: bool,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub run_id: String,
    pub states: Vec<ArchiveState>,
    pub baseline_source: BaselineSource,
    pub detected_date: NaiveDate,
    /// Every detected event, including ones already in the log
    pub events: Vec<ChangeEvent>,
    /// New changelog lines (would-be lines in a dry run)
    pub appended: usize,
    pub skipped_duplicates: usize,
    /// Set when the dated snapshot file was written
    pub dated_written: Option<NaiveDate>,
    pub latest_written: bool,
    pub dry_run: bool,
}

/// A run that ended in `Failed`
#[derive(Debug, Clone)]
pub struct ArchiveFailure {
    /// State in which the error occurred
    pub failed_in: ArchiveState,
    /// Visited states, ending with `Failed`
    pub states: Vec<ArchiveState>,
    pub error: ExError,
}

impl std::fmt::Display for ArchiveFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "archive run failed during {}: {}", self.failed_in, self.error)
    }
}

impl std::error::Error for ArchiveFailure {}

impl From<ArchiveFailure> for ExError {
    fn from(failure: ArchiveFailure) -> Self {
        failure.error
    }
}

/// Runs baseline resolution, detection and persistence for one batch
pub struct ArchiveOrchestrator<'a> {
    store: &'a SnapshotStore,
    history: &'a dyn HistoryReader,
    history_path: String,
    detector: ChangeDetector,
    context: RunContext,
}

struct RunTrace {
    states: Vec<ArchiveState>,
}

impl RunTrace {
    fn enter(&mut self, state: ArchiveState) {
        tracing::debug!(state = %state, "Entering state");
        self.states.push(state);
    }

    fn current(&self) -> ArchiveState {
        self.states
            .last()
            .copied()
            .unwrap_or(ArchiveState::ResolveBaseline)
    }

    fn fail(mut self, error: ExError) -> ArchiveFailure {
        let failed_in = self.current();
        self.states.push(ArchiveState::Failed);
        ArchiveFailure {
            failed_in,
            states: self.states,
            error,
        }
    }
}

impl<'a> ArchiveOrchestrator<'a> {
    pub fn new(
        store: &'a SnapshotStore,
        history: &'a dyn HistoryReader,
        history_path: impl Into<String>,
    ) -> Self {
        Self {
            store,
            history,
            history_path: history_path.into(),
            detector: ChangeDetector::default(),
            context: RunContext::new(),
        }
    }

    pub fn with_detector(mut self, detector: ChangeDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_context(mut self, context: RunContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Archive `current`, detected at `detected_at`.
    pub fn run(
        &self,
        current: &Snapshot,
        detected_at: DateTime<Utc>,
        options: &ArchiveOptions,
    ) -> std::result::Result<ArchiveReport, ArchiveFailure> {
        let start = Instant::now();
        let span = tracing::info_span!(
            "archive_run",
            run_id = %self.context.run_id,
            origin = self.context.origin_label()
        );
        let _guard = span.enter();
        declarch_core::log_op_start!(
            "archive_run",
            mode = %options.mode,
            dry_run = options.dry_run,
            record_count = current.len()
        );

        let mut trace = RunTrace { states: Vec::new() };
        let result = self.execute(&mut trace, current, detected_at, options);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(mut report) => {
                trace.enter(ArchiveState::Done);
                report.states = trace.states;
                declarch_core::log_op_end!(
                    "archive_run",
                    duration_ms = duration_ms,
                    event_count = report.events.len(),
                    appended = report.appended
                );
                Ok(report)
            }
            Err(err) => {
                let failure = trace.fail(err);
                declarch_core::log_op_error!(
                    "archive_run",
                    failure.error.clone(),
                    duration_ms = duration_ms,
                    state = %failure.failed_in
                );
                Err(failure)
            }
        }
    }

    fn execute(
        &self,
        trace: &mut RunTrace,
        current: &Snapshot,
        detected_at: DateTime<Utc>,
        options: &ArchiveOptions,
    ) -> std::result::Result<ArchiveReport, ExError> {
        let detected_date = detected_at.date_naive();
        let current = current.clone().with_captured_date(detected_date);

        trace.enter(ArchiveState::ResolveBaseline);
        let resolver = BaselineResolver::new(self.store, self.history, self.history_path.clone());
        let baseline = resolver.resolve(&options.mode)?;

        trace.enter(ArchiveState::Detect);
        let events = self
            .detector
            .detect(&baseline.snapshot, &current, detected_at)
            .map_err(|e| ExError::from(e).with_op("detect"))?;

        let mut report = ArchiveReport {
            run_id: self.context.run_id.to_string(),
            states: Vec::new(),
            baseline_source: baseline.source,
            detected_date,
            events,
            appended: 0,
            skipped_duplicates: 0,
            dated_written: None,
            latest_written: false,
            dry_run: options.dry_run,
        };

        if options.dry_run {
            let changelog = ChangeLog::open(self.store.layout().changelog_path())?;
            let prepared = changelog.prepare_append(&report.events)?;
            report.appended = prepared.events.len();
            report.skipped_duplicates = prepared.skipped_duplicates;
            tracing::info!(
                event_count = report.events.len(),
                appended = report.appended,
                "Dry run, nothing written"
            );
            return Ok(report);
        }

        if report.events.is_empty() {
            trace.enter(ArchiveState::PersistSnapshots);
            self.store.prepare_latest(&current)?.commit()?;
            report.latest_written = true;
            tracing::info!("No changes detected; latest snapshot refreshed");
            return Ok(report);
        }

        trace.enter(ArchiveState::DeduplicateAndLog);
        // Everything fallible that does not write happens before the first commit
        let mut changelog = ChangeLog::open(self.store.layout().changelog_path())?;
        let append = changelog.prepare_append(&report.events)?;
        let dated_events = events_recorded_on(&changelog, &append, detected_date);
        let dated = self
            .store
            .prepare_merge_dated(detected_date, &dated_events, &current)?;
        let latest = self.store.prepare_latest(&current)?;

        let outcome = changelog.commit_append(append)?;
        report.appended = outcome.appended;
        report.skipped_duplicates = outcome.skipped_duplicates;

        trace.enter(ArchiveState::PersistSnapshots);
        if self.store.commit_dated(dated)? {
            report.dated_written = Some(detected_date);
        }
        latest.commit()?;
        report.latest_written = true;

        Ok(report)
    }
}

/// Events that belong in the dated snapshot for `date`: the ones about to be
/// logged, plus duplicates first logged on `date` itself. The latter re-merge
/// after a crash between the log write and the dated write.
fn events_recorded_on(
    changelog: &ChangeLog,
    append: &PreparedAppend,
    date: NaiveDate,
) -> Vec<ChangeEvent> {
    let replayed = append
        .duplicates
        .iter()
        .filter(|event| changelog.logged_on(&event.fingerprint) == Some(date));
    append.events.iter().chain(replayed).cloned().collect()
}
