//! Changelog listing command

use clap::Args;
use declarch_store::{ArchiveLayout, ChangeLog};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Directory holding logs/changes.jsonl
    #[arg(long)]
    pub data_dir: PathBuf,

    /// Only events whose service key contains this text
    #[arg(long)]
    pub service: Option<String>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: LogArgs) -> Result<(), Box<dyn std::error::Error>> {
    let layout = ArchiveLayout::new(&args.data_dir);
    let log = ChangeLog::open(layout.changelog_path())?;
    let (mut events, skipped) = log.read_events()?;

    if let Some(needle) = &args.service {
        events.retain(|e| e.service_key.contains(needle.as_str()));
    }
    if skipped > 0 {
        tracing::warn!(skipped, "Changelog lines could not be decoded");
    }

    super::print_events(&events, args.json)
}
