//! declarch Core - in-memory model and change detection
//!
//! This crate provides the pure parts of the declaration archive:
//! - `DeclarationRecord`, `Snapshot` and `ChangeEvent` models
//! - Normalization of scraped declaration data
//! - The change detector with volatile-field suppression and fingerprints
//! - The canonical error facility and structured logging facility
//!
//! Filesystem and version-control access live in `declarch-store`;
//! orchestration lives in `declarch-engine`.

pub mod detect;
pub mod errors;
pub mod ingest;
pub mod logging_facility;
pub mod model;

// Re-export commonly used types
pub use detect::ChangeDetector;
pub use errors::{DeclarchError, ExError, ExErrorKind, Result};
pub use model::{ChangeEvent, ChangeKind, DeclarationRecord, FieldChange, Snapshot};
