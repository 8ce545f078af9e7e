//! Point-in-time collection of declarations.
//!
//! ## On-disk document
//!
//! ```text
//! { "capturedDate": "2025-03-01", "urls": [ <records in key order> ] }
//! ```
//!
//! Readers also accept a bare array of records and a `{"urls": [...]}`
//! object without a date, which is what earlier pipeline versions wrote.

use crate::errors::{DeclarchError, Result};
use crate::model::record::DeclarationRecord;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered-by-key mapping from service key to declaration, tagged with a
/// capture date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    captured_date: Option<NaiveDate>,
    records: BTreeMap<String, DeclarationRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    captured_date: Option<NaiveDate>,
    urls: Vec<&'a DeclarationRecord>,
}

impl Snapshot {
    /// Empty snapshot with no capture date (first-run baseline).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Empty snapshot captured on `date`.
    pub fn new(captured_date: NaiveDate) -> Self {
        Self {
            captured_date: Some(captured_date),
            records: BTreeMap::new(),
        }
    }

    /// Build a snapshot from records, indexing each by its service key.
    ///
    /// Records without a key are skipped with a warning. On duplicate keys
    /// the later record wins.
    pub fn from_records<I>(captured_date: Option<NaiveDate>, records: I) -> Self
    where
        I: IntoIterator<Item = DeclarationRecord>,
    {
        let mut snapshot = Self {
            captured_date,
            records: BTreeMap::new(),
        };
        for record in records {
            snapshot.insert(record);
        }
        snapshot
    }

    /// Insert or replace a record. Returns its key, or `None` if it has none.
    pub fn insert(&mut self, record: DeclarationRecord) -> Option<String> {
        match record.service_key() {
            Some(key) => {
                self.records.insert(key.clone(), record);
                Some(key)
            }
            None => {
                tracing::warn!(
                    url = %record.url,
                    title = %record.title,
                    "Skipping declaration without url or title"
                );
                None
            }
        }
    }

    pub fn captured_date(&self) -> Option<NaiveDate> {
        self.captured_date
    }

    /// Same records, different capture date.
    pub fn with_captured_date(mut self, date: NaiveDate) -> Self {
        self.captured_date = Some(date);
        self
    }

    pub fn get(&self, key: &str) -> Option<&DeclarationRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Service keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }

    /// `(key, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeclarationRecord)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize to the canonical pretty-printed document, newline-terminated.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        let doc = SnapshotDocument {
            captured_date: self.captured_date,
            urls: self.records.values().collect(),
        };
        let mut bytes = serde_json::to_vec_pretty(&doc)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parse a snapshot document.
    ///
    /// `origin` names the source (path or `rev:path`) in error messages.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` if the bytes are not JSON, the root has the wrong
    /// shape, the capture date is invalid or any record fails to decode.
    pub fn from_json_bytes(bytes: &[u8], origin: &str) -> Result<Self> {
        let malformed = |reason: String| DeclarchError::MalformedRecord {
            origin: origin.to_string(),
            reason,
        };

        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| malformed(format!("not valid JSON: {}", e)))?;

        let (captured_date, items) = match root {
            Value::Array(items) => (None, items),
            Value::Object(mut obj) => {
                let date = match obj.remove("capturedDate") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(
                        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                            .map_err(|e| malformed(format!("invalid capturedDate {:?}: {}", s, e)))?,
                    ),
                    Some(other) => {
                        return Err(malformed(format!(
                            "capturedDate must be a string, got {}",
                            other
                        )))
                    }
                };
                match obj.remove("urls") {
                    Some(Value::Array(items)) => (date, items),
                    Some(_) => return Err(malformed("`urls` must be an array".to_string())),
                    None => return Err(malformed("missing `urls` array".to_string())),
                }
            }
            _ => {
                return Err(malformed(
                    "root must be an array or an object with `urls`".to_string(),
                ))
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.into_iter().enumerate() {
            let record: DeclarationRecord = serde_json::from_value(item)
                .map_err(|e| malformed(format!("record {}: {}", idx, e)))?;
            records.push(record);
        }

        Ok(Self::from_records(captured_date, records))
    }
}
