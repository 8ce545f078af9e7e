//! declarch Engine - Orchestration layer
//!
//! Coordinates baseline resolution, change detection and persistence for
//! one archive run.

pub mod baseline;
pub mod config;
pub mod orchestrator;

pub use baseline::{Baseline, BaselineResolver, BaselineSource};
pub use config::{BaselineMode, BaselineSettings};
pub use orchestrator::{ArchiveOptions, ArchiveOrchestrator, ArchiveReport, ArchiveState};
