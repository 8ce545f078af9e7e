use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// What happened to a service between baseline and current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        };
        f.write_str(s)
    }
}

/// Before/after values of one field. `null` stands for "absent".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// One detected, meaningful difference for one service.
///
/// Serialized as one changelog line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// De-duplication identity, see `detect::fingerprint`
    pub fingerprint: String,
    pub kind: ChangeKind,
    pub service_key: String,
    pub url: String,
    pub domain: String,
    /// Detection timestamp
    pub ts: DateTime<Utc>,
    pub detected_date: NaiveDate,
    /// Date prefix of the record's `updatedAt`, when it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
    /// Every differing field, including volatile ones
    pub changed: BTreeMap<String, FieldChange>,
    /// WCAG codes present now but not before
    #[serde(default)]
    pub added: Vec<String>,
    /// WCAG codes present before but not now
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub before_hash: Option<String>,
    #[serde(default)]
    pub after_hash: Option<String>,
}

impl ChangeEvent {
    /// Names of changed fields, sorted.
    pub fn changed_fields(&self) -> Vec<&str> {
        self.changed.keys().map(String::as_str).collect()
    }
}
