//! Change detection engine.
//!
//! The entry point is [`ChangeDetector::detect`], which compares two
//! snapshots and returns one [`ChangeEvent`] per service with a meaningful
//! difference.

use crate::detect::fingerprint::{compute_fingerprint, compute_record_digest};
use crate::errors::Result;
use crate::model::{ChangeEvent, ChangeKind, DeclarationRecord, FieldChange, Snapshot};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Fields whose change alone is not meaningful.
pub const DEFAULT_VOLATILE_FIELDS: &[&str] = &["updatedAt"];

/// Computes semantic differences between snapshots.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    volatile_fields: BTreeSet<String>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::with_volatile_fields(DEFAULT_VOLATILE_FIELDS.iter().copied())
    }
}

impl ChangeDetector {
    /// Detector with an explicit volatile-field list (camelCase field names).
    pub fn with_volatile_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            volatile_fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn volatile_fields(&self) -> impl Iterator<Item = &str> {
        self.volatile_fields.iter().map(String::as_str)
    }

    pub fn is_volatile(&self, field: &str) -> bool {
        self.volatile_fields.contains(field)
    }

    /// Compare `baseline` against `current`.
    ///
    /// Events are ordered by service key. Keys only in `current` become
    /// `Added`, keys only in `baseline` become `Removed`, and keys in both
    /// become `Modified` when at least one non-volatile field differs.
    ///
    /// # Errors
    ///
    /// Returns `DeclarchError::Serialization` if a record cannot be encoded
    /// for comparison or hashing.
    pub fn detect(
        &self,
        baseline: &Snapshot,
        current: &Snapshot,
        detected_at: DateTime<Utc>,
    ) -> Result<Vec<ChangeEvent>> {
        let start = Instant::now();
        crate::log_op_start!(
            "detect",
            baseline_len = baseline.len(),
            current_len = current.len()
        );

        let keys: BTreeSet<&String> = baseline.keys().chain(current.keys()).collect();
        let mut events = Vec::new();

        for key in keys {
            let event = match (baseline.get(key), current.get(key)) {
                (None, Some(after)) => Some(self.added(key, after, detected_at)?),
                (Some(before), None) => Some(self.removed(key, before, detected_at)?),
                (Some(before), Some(after)) => self.modified(key, before, after, detected_at)?,
                (None, None) => None,
            };
            if let Some(event) = event {
                tracing::debug!(
                    service_key = %event.service_key,
                    kind = %event.kind,
                    fields = ?event.changed_fields(),
                    "Detected change"
                );
                events.push(event);
            }
        }

        crate::log_op_end!(
            "detect",
            duration_ms = start.elapsed().as_millis() as u64,
            event_count = events.len()
        );
        Ok(events)
    }

    /// Field-level differences between two versions of a record.
    ///
    /// Returns `None` when nothing differs or only volatile fields differ.
    pub fn compare_records(
        &self,
        before: &DeclarationRecord,
        after: &DeclarationRecord,
    ) -> Result<Option<BTreeMap<String, FieldChange>>> {
        let changed = diff_fields(&before.to_fields()?, &after.to_fields()?);
        if changed.keys().all(|name| self.is_volatile(name)) {
            return Ok(None);
        }
        Ok(Some(changed))
    }

    fn added(
        &self,
        key: &str,
        after: &DeclarationRecord,
        detected_at: DateTime<Utc>,
    ) -> Result<ChangeEvent> {
        let changed = diff_fields(&Map::new(), &after.to_fields()?);
        let fingerprint = self.fingerprint(key, &changed)?;
        Ok(ChangeEvent {
            fingerprint,
            kind: ChangeKind::Added,
            service_key: key.to_string(),
            url: after.url.clone(),
            domain: after.domain.clone(),
            ts: detected_at,
            detected_date: detected_at.date_naive(),
            updated_date: after.updated_date(),
            changed,
            added: after.non_conformities.clone(),
            removed: Vec::new(),
            before_hash: None,
            after_hash: Some(compute_record_digest(after)?),
        })
    }

    fn removed(
        &self,
        key: &str,
        before: &DeclarationRecord,
        detected_at: DateTime<Utc>,
    ) -> Result<ChangeEvent> {
        let changed = diff_fields(&before.to_fields()?, &Map::new());
        let fingerprint = self.fingerprint(key, &changed)?;
        Ok(ChangeEvent {
            fingerprint,
            kind: ChangeKind::Removed,
            service_key: key.to_string(),
            url: before.url.clone(),
            domain: before.domain.clone(),
            ts: detected_at,
            detected_date: detected_at.date_naive(),
            updated_date: before.updated_date(),
            changed,
            added: Vec::new(),
            removed: before.non_conformities.clone(),
            before_hash: Some(compute_record_digest(before)?),
            after_hash: None,
        })
    }

    fn modified(
        &self,
        key: &str,
        before: &DeclarationRecord,
        after: &DeclarationRecord,
        detected_at: DateTime<Utc>,
    ) -> Result<Option<ChangeEvent>> {
        let Some(changed) = self.compare_records(before, after)? else {
            return Ok(None);
        };
        let (added, removed) = code_delta(&before.non_conformities, &after.non_conformities);
        let fingerprint = self.fingerprint(key, &changed)?;
        Ok(Some(ChangeEvent {
            fingerprint,
            kind: ChangeKind::Modified,
            service_key: key.to_string(),
            url: after.url.clone(),
            domain: after.domain.clone(),
            ts: detected_at,
            detected_date: detected_at.date_naive(),
            updated_date: after.updated_date(),
            changed,
            added,
            removed,
            before_hash: Some(compute_record_digest(before)?),
            after_hash: Some(compute_record_digest(after)?),
        }))
    }

    /// Fingerprint over the non-volatile part of `changed`.
    fn fingerprint(&self, key: &str, changed: &BTreeMap<String, FieldChange>) -> Result<String> {
        let fields: Vec<(&str, &Value, &Value)> = changed
            .iter()
            .filter(|(name, _)| !self.is_volatile(name))
            .map(|(name, change)| (name.as_str(), &change.before, &change.after))
            .collect();
        compute_fingerprint(key, &fields)
    }
}

/// Every field whose value differs; absent names compare as `null`.
fn diff_fields(before: &Map<String, Value>, after: &Map<String, Value>) -> BTreeMap<String, FieldChange> {
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let old = before.get(name).unwrap_or(&Value::Null);
            let new = after.get(name).unwrap_or(&Value::Null);
            (old != new).then(|| {
                (
                    name.clone(),
                    FieldChange {
                        before: old.clone(),
                        after: new.clone(),
                    },
                )
            })
        })
        .collect()
}

/// `(added, removed)` WCAG codes, each sorted.
fn code_delta(before: &[String], after: &[String]) -> (Vec<String>, Vec<String>) {
    let before: BTreeSet<&String> = before.iter().collect();
    let after: BTreeSet<&String> = after.iter().collect();
    let added = after.difference(&before).map(|s| s.to_string()).collect();
    let removed = before.difference(&after).map(|s| s.to_string()).collect();
    (added, removed)
}
