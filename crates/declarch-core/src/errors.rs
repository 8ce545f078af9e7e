//! Errors.
//!
//! Two layers:
//!
//! - [`DeclarchError`]: what went wrong in domain terms, raised by the pure
//!   code in this crate.
//! - [`ExError`]: the structured error every crate boundary returns. It has a
//!   [`ExErrorKind`] with a stable `ERR_*` code plus optional context (the
//!   failing op, the file or key involved, the revision). The CLI prints it,
//!   and `log_op_error!` logs its kind and code.

use std::fmt;
use thiserror::Error;

/// Result type alias using DeclarchError
pub type Result<T> = std::result::Result<T, DeclarchError>;

/// Classification of an [`ExError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    InvalidInput,
    /// Expected on a first run in local mode
    NotFound,
    /// A snapshot or changelog line failed to parse
    MalformedRecord,
    /// An explicit revision was requested but the snapshot was absent there
    BaselineMissing,
    /// Automatic backtracking ran out of steps without a usable snapshot
    BaselineExhausted,
    Io,
    Serialization,
    /// A helper process (git) could not be run
    ExternalService,
}

impl ExErrorKind {
    /// Stable code, safe to match on in scripts and tests
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::MalformedRecord => "ERR_MALFORMED_RECORD",
            ExErrorKind::BaselineMissing => "ERR_BASELINE_MISSING",
            ExErrorKind::BaselineExhausted => "ERR_BASELINE_EXHAUSTED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::ExternalService => "ERR_EXTERNAL_SERVICE",
        }
    }

    /// Whether this kind aborts a run during baseline resolution
    pub fn is_baseline_failure(&self) -> bool {
        matches!(
            self,
            ExErrorKind::BaselineMissing | ExErrorKind::BaselineExhausted
        )
    }
}

/// Structured error with a kind and diagnostic context
#[derive(Debug, Clone, PartialEq)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    revision: Option<String>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            revision: None,
            message: String::new(),
        }
    }

    /// Operation that failed, e.g. `load_latest`
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// File path, `rev:path` or service key involved
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// `[CODE] op: message (entity: ..., revision: ...)`
impl fmt::Display for ExError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.code())?;
        match (&self.op, self.message.is_empty()) {
            (Some(op), false) => write!(f, " {}: {}", op, self.message)?,
            (Some(op), true) => write!(f, " {} failed", op)?,
            (None, false) => write!(f, " {}", self.message)?,
            (None, true) => {}
        }
        let context: Vec<String> = [("entity", &self.entity_id), ("revision", &self.revision)]
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
            .collect();
        if !context.is_empty() {
            write!(f, " ({})", context.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

/// Domain errors raised while loading, parsing and comparing snapshots
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeclarchError {
    #[error("snapshot not found: {path}")]
    SnapshotNotFound { path: String },

    #[error("baseline {path} not present at revision {revision}")]
    BaselineMissing { revision: String, path: String },

    #[error("no usable baseline {path} within {steps} revision(s) of HEAD")]
    BaselineExhausted { steps: u32, path: String },

    #[error("malformed record in {origin}: {reason}")]
    MalformedRecord { origin: String, reason: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl From<DeclarchError> for ExError {
    fn from(err: DeclarchError) -> Self {
        let message = err.to_string();
        match err {
            DeclarchError::SnapshotNotFound { path } => {
                ExError::new(ExErrorKind::NotFound).with_entity_id(path)
            }
            DeclarchError::BaselineMissing { revision, path } => {
                ExError::new(ExErrorKind::BaselineMissing)
                    .with_entity_id(path)
                    .with_revision(revision)
            }
            DeclarchError::BaselineExhausted { path, .. } => {
                ExError::new(ExErrorKind::BaselineExhausted).with_entity_id(path)
            }
            DeclarchError::MalformedRecord { origin, reason } => {
                return ExError::new(ExErrorKind::MalformedRecord)
                    .with_entity_id(origin)
                    .with_message(reason)
            }
            DeclarchError::InvalidInput { .. } => ExError::new(ExErrorKind::InvalidInput),
            DeclarchError::Serialization { .. } => ExError::new(ExErrorKind::Serialization),
        }
        .with_message(message)
    }
}

impl From<serde_json::Error> for DeclarchError {
    fn from(err: serde_json::Error) -> Self {
        DeclarchError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let cases = [
            (ExErrorKind::BaselineMissing, "ERR_BASELINE_MISSING"),
            (ExErrorKind::BaselineExhausted, "ERR_BASELINE_EXHAUSTED"),
            (ExErrorKind::MalformedRecord, "ERR_MALFORMED_RECORD"),
            (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
            (ExErrorKind::ExternalService, "ERR_EXTERNAL_SERVICE"),
        ];
        for (kind, code) in cases {
            assert_eq!(kind.code(), code, "{:?}", kind);
        }
    }

    #[test]
    fn test_baseline_failure_classification() {
        assert!(ExErrorKind::BaselineMissing.is_baseline_failure());
        assert!(ExErrorKind::BaselineExhausted.is_baseline_failure());
        assert!(!ExErrorKind::NotFound.is_baseline_failure());
        assert!(!ExErrorKind::MalformedRecord.is_baseline_failure());
    }

    #[test]
    fn test_display_shape() {
        let err = ExError::new(ExErrorKind::BaselineMissing)
            .with_op("resolve_baseline")
            .with_entity_id("data/latest.json")
            .with_revision("HEAD~2")
            .with_message("absent");
        assert_eq!(
            err.to_string(),
            "[ERR_BASELINE_MISSING] resolve_baseline: absent (entity: data/latest.json, revision: HEAD~2)"
        );
        assert_eq!(ExError::new(ExErrorKind::Io).with_op("sync").to_string(), "[ERR_IO] sync failed");
    }

    #[test]
    fn test_domain_conversion_keeps_context() {
        let ex: ExError = DeclarchError::BaselineMissing {
            revision: "HEAD".into(),
            path: "data/latest.json".into(),
        }
        .into();
        assert_eq!(ex.kind(), ExErrorKind::BaselineMissing);
        assert_eq!(ex.revision(), Some("HEAD"));
        assert_eq!(ex.entity_id(), Some("data/latest.json"));

        let ex: ExError = DeclarchError::MalformedRecord {
            origin: "HEAD:latest.json".into(),
            reason: "not valid JSON".into(),
        }
        .into();
        assert_eq!(ex.message(), "not valid JSON");
    }
}
