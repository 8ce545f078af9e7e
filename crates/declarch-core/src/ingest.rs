//! Normalization of scraped declaration data.
//!
//! The scraper and enrichment steps emit loosely shaped JSON: field names
//! vary between sources and WCAG codes arrive as strings, lists or objects.
//! This module folds every entry into a [`DeclarationRecord`].
//!
//! ## Field resolution
//!
//! - url: `url`, then `href`
//! - title: `title`, then `name`
//! - updatedAt: `updatedAt`, then `lastChecked`
//! - domain: `domain`, else the URL host
//! - codes: the first present of [`CODE_FIELDS`], else the first key that
//!   mentions wcag/violation/nonconform/issue/problem
//! - total: the first integer-like of [`COUNT_FIELDS`], else the code count
//!
//! Fields not consumed above are kept as record metadata.

use crate::errors::{DeclarchError, Result};
use crate::model::{key, DeclarationRecord, Snapshot};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Known WCAG code field names, in lookup order.
pub const CODE_FIELDS: &[&str] = &[
    "nonConformities",
    "violations",
    "wcag",
    "wcagCodes",
    "wcag_violations",
    "wcag_nonconformities",
    "issues",
    "problems",
];

/// Known violation count field names, in lookup order.
pub const COUNT_FIELDS: &[&str] = &[
    "totalNonConformities",
    "total_non_conformities",
    "violationsCount",
    "violations_count",
    "nonConformitiesCount",
    "non_conformities_count",
    "wcagCount",
    "wcag_count",
    "wcagViolationsCount",
    "wcag_violations_count",
    "ncTotal",
    "count",
    "total",
];

const CODE_HINTS: &[&str] = &["wcag", "violation", "nonconform", "issue", "problem"];
const CODE_OBJECT_KEYS: &[&str] = &["code", "wcag", "criterion", "id", "wcagId", "wcag_id"];
const IDENTITY_FIELDS: &[&str] = &[
    "url",
    "href",
    "domain",
    "title",
    "name",
    "updatedAt",
    "lastChecked",
    "status",
];

/// Parse the scraper's output into a snapshot captured on `captured`.
///
/// Accepts `{"urls": [...]}` or a bare array. Non-object entries and entries
/// without url or title are skipped with a warning.
///
/// # Errors
///
/// `InvalidInput` if the bytes are not JSON or the root has another shape.
pub fn parse_current(bytes: &[u8], origin: &str, captured: NaiveDate) -> Result<Snapshot> {
    let root: Value = serde_json::from_slice(bytes).map_err(|e| DeclarchError::InvalidInput {
        reason: format!("{}: not valid JSON: {}", origin, e),
    })?;

    let entries = match root {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("urls") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(DeclarchError::InvalidInput {
                    reason: format!("{}: expected a `urls` array", origin),
                })
            }
        },
        _ => {
            return Err(DeclarchError::InvalidInput {
                reason: format!("{}: root must be an array or an object with `urls`", origin),
            })
        }
    };

    let mut snapshot = Snapshot::new(captured);
    for (idx, entry) in entries.iter().enumerate() {
        match entry.as_object() {
            Some(raw) => {
                snapshot.insert(normalize_entry(raw));
            }
            None => tracing::warn!(origin, index = idx, "Skipping non-object declaration entry"),
        }
    }
    Ok(snapshot)
}

/// Fold one raw scraped entry into a record.
pub fn normalize_entry(raw: &Map<String, Value>) -> DeclarationRecord {
    let url = first_str(raw, &["url", "href"]);
    let domain = match first_str(raw, &["domain"]) {
        d if d.is_empty() => key::domain_of(&url),
        d => d,
    };
    let title = first_str(raw, &["title", "name"]);
    let updated_at = first_str(raw, &["updatedAt", "lastChecked"]);
    let status = raw
        .get("status")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let code_field = find_code_field(raw);
    let codes = code_field
        .and_then(|field| raw.get(field))
        .map(extract_codes)
        .unwrap_or_default();
    let count_field = COUNT_FIELDS
        .iter()
        .copied()
        .find(|f| raw.get(*f).and_then(as_count).is_some());
    let total = count_field
        .and_then(|f| raw.get(f))
        .and_then(as_count)
        .unwrap_or(codes.len() as u64);

    let metadata: BTreeMap<String, Value> = raw
        .iter()
        .filter(|(k, _)| {
            !IDENTITY_FIELDS.contains(&k.as_str())
                && Some(k.as_str()) != code_field
                && !COUNT_FIELDS.contains(&k.as_str())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    DeclarationRecord {
        url,
        domain,
        title,
        status,
        non_conformities: codes,
        total_non_conformities: total,
        updated_at,
        metadata,
    }
}

fn first_str(raw: &Map<String, Value>, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|n| raw.get(*n).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn find_code_field(raw: &Map<String, Value>) -> Option<&str> {
    if let Some(field) = CODE_FIELDS.iter().copied().find(|f| raw.contains_key(*f)) {
        return Some(field);
    }
    raw.keys()
        .map(String::as_str)
        .find(|k| {
            let lower = k.to_lowercase();
            CODE_HINTS.iter().any(|hint| lower.contains(hint))
                && !COUNT_FIELDS.contains(k)
        })
}

/// Sorted, de-duplicated codes from any supported shape.
fn extract_codes(data: &Value) -> Vec<String> {
    let mut codes = BTreeSet::new();
    match data {
        Value::String(s) => {
            codes.extend(s.split(';').map(str::trim).filter(|c| !c.is_empty()).map(str::to_string));
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => {
                        codes.insert(s.trim().to_string());
                    }
                    Value::Object(obj) => {
                        let code = CODE_OBJECT_KEYS
                            .iter()
                            .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                            .map(str::trim)
                            .find(|c| !c.is_empty());
                        if let Some(code) = code {
                            codes.insert(code.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(obj) => {
            codes.extend(obj.keys().map(|k| k.trim()).filter(|k| !k.is_empty()).map(str::to_string));
        }
        _ => {}
    }
    codes.into_iter().collect()
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
                .then(|| s.parse().ok())
                .flatten()
        }
        _ => None,
    }
}
