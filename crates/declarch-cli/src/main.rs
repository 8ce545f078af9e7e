//! declarch CLI
//!
//! Command-line interface for the accessibility declaration archive

use clap::{Parser, Subcommand, ValueEnum};
use declarch_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "declarch")]
#[command(about = "declarch - Accessibility declaration change archive", long_about = None)]
struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect changes against the baseline, log them and persist snapshots
    Run(commands::run::RunArgs),
    /// Print the changes between two snapshot files
    Diff(commands::diff::DiffArgs),
    /// Print logged change events
    Log(commands::log::LogArgs),
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
        Commands::Log(args) => commands::log::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
