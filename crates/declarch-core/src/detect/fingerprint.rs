//! Fingerprints and record digests.
//!
//! ## Fingerprint layout
//!
//! The fingerprint is the hex SHA-256 of the compact JSON array
//!
//! ```text
//! [ service_key, [field names...], [before values...], [after values...] ]
//! ```
//!
//! with field names sorted ascending and the value arrays in the same order
//! as the names. Object values serialize with sorted keys (serde_json's
//! default map), so the encoding does not depend on input key order.
//! Changing this layout changes every fingerprint and breaks
//! de-duplication against existing changelogs.

use crate::errors::Result;
use crate::model::DeclarationRecord;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the fingerprint of a change.
///
/// `fields` are `(name, before, after)` triples; they are sorted by name
/// here, so callers may pass them in any order.
///
/// # Errors
///
/// Returns `DeclarchError::Serialization` if JSON encoding fails.
pub fn compute_fingerprint(service_key: &str, fields: &[(&str, &Value, &Value)]) -> Result<String> {
    let mut sorted: Vec<&(&str, &Value, &Value)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let names: Vec<&str> = sorted.iter().map(|(name, _, _)| *name).collect();
    let befores: Vec<&Value> = sorted.iter().map(|(_, before, _)| *before).collect();
    let afters: Vec<&Value> = sorted.iter().map(|(_, _, after)| *after).collect();

    let canonical = serde_json::to_string(&(service_key, names, befores, afters))?;
    Ok(hash_string(&canonical))
}

/// Digest of a record's full canonical JSON.
///
/// # Errors
///
/// Returns `DeclarchError::Serialization` if JSON encoding fails.
pub fn compute_record_digest(record: &DeclarationRecord) -> Result<String> {
    let canonical = serde_json::to_string(&Value::Object(record.to_fields()?))?;
    Ok(hash_string(&canonical))
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
