//! Archive run command

use chrono::{NaiveDate, TimeZone, Utc};
use clap::Args;
use declarch_core::errors::ExError;
use declarch_core::ingest::parse_current;
use declarch_core::ChangeDetector;
use declarch_core_types::RunContext;
use declarch_engine::config::{parse_max_backtrack, repo_relative_path};
use declarch_engine::{ArchiveOptions, ArchiveOrchestrator, BaselineMode, BaselineSettings};
use declarch_store::{ArchiveLayout, GitHistoryReader, SnapshotStore};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Current declarations JSON produced by the scraper
    #[arg(long)]
    pub input: PathBuf,

    /// Directory holding latest.json, snapshots/ and logs/
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Git repository the data directory is committed in
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Detection date (YYYY-MM-DD); defaults to today in UTC
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Field whose change alone is ignored (repeatable; default: updatedAt)
    #[arg(long = "volatile-field")]
    pub volatile_fields: Vec<String>,

    #[arg(long)]
    pub dry_run: bool,

    /// Diff against the local latest file instead of git history
    #[arg(long)]
    pub test_mode: bool,

    #[arg(long)]
    pub baseline_ref: Option<String>,

    #[arg(long)]
    pub auto_backtrack: bool,

    #[arg(long, value_parser = parse_backtrack_arg)]
    pub max_backtrack: Option<u32>,
}

/// Stderr note for runs stopped before any write because no baseline
/// could be resolved
fn baseline_failure_note(error: &ExError, mode: &BaselineMode) -> Option<String> {
    error.kind().is_baseline_failure().then(|| {
        format!(
            "No baseline available ({}); nothing was written. Use --test-mode for a local baseline.",
            mode
        )
    })
}

fn parse_backtrack_arg(raw: &str) -> Result<u32, String> {
    parse_max_backtrack(raw).map_err(|e| e.message().to_string())
}

pub fn execute(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = BaselineSettings::from_env()?;
    settings.test_mode |= args.test_mode;
    settings.auto_backtrack |= args.auto_backtrack;
    if let Some(rev) = args.baseline_ref {
        settings.baseline_ref = Some(rev);
    }
    if let Some(max) = args.max_backtrack {
        settings.max_backtrack = max;
    }
    let mode = settings.mode();

    let detected_at = match args.date {
        Some(date) => Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)),
        None => Utc::now(),
    };

    let raw = std::fs::read(&args.input)?;
    let current = parse_current(&raw, &args.input.display().to_string(), detected_at.date_naive())
        .map_err(|e| ExError::from(e).with_op("parse_input"))?;

    let layout = ArchiveLayout::new(&args.data_dir);
    let history_path = match mode {
        BaselineMode::Local => layout.latest_path().display().to_string(),
        _ => repo_relative_path(&args.repo, &layout.latest_path())?,
    };
    let store = SnapshotStore::new(layout);
    let history = GitHistoryReader::new(&args.repo);

    let detector = if args.volatile_fields.is_empty() {
        ChangeDetector::default()
    } else {
        ChangeDetector::with_volatile_fields(args.volatile_fields)
    };

    let orchestrator = ArchiveOrchestrator::new(&store, &history, history_path)
        .with_detector(detector)
        .with_context(RunContext::new().with_origin("cli"));

    let options = ArchiveOptions {
        mode: mode.clone(),
        dry_run: args.dry_run,
    };
    let report = orchestrator
        .run(&current, detected_at, &options)
        .map_err(|failure| {
            if let Some(note) = baseline_failure_note(&failure.error, &mode) {
                eprintln!("{}", note);
            }
            failure
        })?;

    if report.dry_run {
        println!("Dry run (nothing written):");
    } else {
        println!("Archive run complete:");
    }
    println!("  run_id: {}", report.run_id);
    println!("  baseline: {} ({})", report.baseline_source, mode);
    println!("  records: {}", current.len());
    println!("  changes: {}", report.events.len());
    println!("  appended: {}", report.appended);
    println!("  duplicates: {}", report.skipped_duplicates);
    if let Some(date) = report.dated_written {
        println!("  dated snapshot: {}", date);
    }
    for event in &report.events {
        println!("  {}", super::describe(event));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarch_core::errors::ExErrorKind;

    #[test]
    fn test_note_only_for_baseline_failures() {
        let mode = BaselineMode::AutoBacktrack { max_steps: 3 };
        let exhausted = ExError::new(ExErrorKind::BaselineExhausted);
        let note = baseline_failure_note(&exhausted, &mode).unwrap();
        assert!(note.contains("auto-backtrack:3"));
        assert!(note.contains("nothing was written"));

        let io = ExError::new(ExErrorKind::Io);
        assert!(baseline_failure_note(&io, &mode).is_none());
    }
}
