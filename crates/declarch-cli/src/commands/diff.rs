//! Snapshot diff command

use chrono::Utc;
use clap::Args;
use declarch_core::errors::ExError;
use declarch_core::ingest::parse_current;
use declarch_core::{ChangeDetector, Snapshot};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Baseline snapshot or scraper output
    pub baseline: PathBuf,

    /// Current snapshot or scraper output
    pub current: PathBuf,

    /// Field whose change alone is ignored (repeatable; default: updatedAt)
    #[arg(long = "volatile-field")]
    pub volatile_fields: Vec<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

fn load(path: &Path) -> Result<Snapshot, Box<dyn std::error::Error>> {
    let raw = std::fs::read(path)?;
    let snapshot = parse_current(&raw, &path.display().to_string(), Utc::now().date_naive())
        .map_err(|e| ExError::from(e).with_op("diff"))?;
    Ok(snapshot)
}

pub fn execute(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let baseline = load(&args.baseline)?;
    let current = load(&args.current)?;

    let detector = if args.volatile_fields.is_empty() {
        ChangeDetector::default()
    } else {
        ChangeDetector::with_volatile_fields(args.volatile_fields)
    };
    let events = detector
        .detect(&baseline, &current, Utc::now())
        .map_err(ExError::from)?;

    if events.is_empty() && !args.json {
        println!("No changes");
    }
    super::print_events(&events, args.json)
}
