//! Error handling for declarch-store
//!
//! Wraps the core ExError with store-specific helpers

use declarch_core::errors::{DeclarchError, ExError, ExErrorKind};
use std::path::Path;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error for a path
pub fn io_error(operation: &str, path: &Path, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_entity_id(path.display().to_string())
        .with_message(err.to_string())
}

/// Create a not-found error for a snapshot path
pub fn snapshot_not_found(path: &Path) -> ExError {
    ExError::from(DeclarchError::SnapshotNotFound {
        path: path.display().to_string(),
    })
    .with_op("load_snapshot")
}

/// Convert a core error, tagging it with the failing operation
pub fn from_core(operation: &str, err: DeclarchError) -> ExError {
    ExError::from(err).with_op(operation.to_string())
}

/// Create an error for a failed external command
pub fn external_service(operation: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::ExternalService)
        .with_op(operation.to_string())
        .with_message(message)
}
