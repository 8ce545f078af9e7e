//! Run correlation.
//!
//! Every archive invocation gets a [`RunId`]; the orchestrator opens a span
//! carrying it so all log lines of one run can be grouped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time-ordered (UUIDv7) identifier of one archive run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for RunId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-run context handed to the orchestrator
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub run_id: RunId,
    /// Who started the run, e.g. `cli`
    pub origin: Option<String>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Origin for log fields, `-` when unset
    pub fn origin_label(&self) -> &str {
        self.origin.as_deref().unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ids_are_unique_v7() {
        let first = RunId::new();
        let second = RunId::new();
        assert_ne!(first, second);
        let parsed = Uuid::parse_str(first.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_run_id_serializes_as_plain_string() {
        let id = RunId::from("0190a6f2-0000-7000-8000-000000000000".to_string());
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"0190a6f2-0000-7000-8000-000000000000\""
        );
    }

    #[test]
    fn test_context_origin() {
        let ctx = RunContext::new().with_origin("cli");
        assert_eq!(ctx.origin_label(), "cli");
        assert_eq!(RunContext::new().origin_label(), "-");
    }
}
