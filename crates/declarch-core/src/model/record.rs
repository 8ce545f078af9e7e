use crate::errors::{DeclarchError, Result};
use crate::model::key;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One accessibility declaration for one digital service.
///
/// Field names are camelCase on disk. Any field not modelled here is kept in
/// `metadata` and round-trips unchanged, so enrichment steps can add data
/// without a schema change.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationRecord {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub title: String,

    /// Compliance status as published in the declaration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Sorted, de-duplicated WCAG success-criterion codes
    #[serde(default)]
    pub non_conformities: Vec<String>,

    #[serde(default)]
    pub total_non_conformities: u64,

    /// Last-updated timestamp as published (free-form, usually ISO date)
    #[serde(default)]
    pub updated_at: String,

    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl DeclarationRecord {
    /// Create a record for a URL with the domain derived from it.
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let domain = key::domain_of(&url);
        Self {
            url,
            domain,
            ..Self::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the compliance status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Set the WCAG codes; the list is sorted, de-duplicated and counted.
    pub fn with_non_conformities<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        codes.sort();
        codes.dedup();
        self.total_non_conformities = codes.len() as u64;
        self.non_conformities = codes;
        self
    }

    /// Set the last-updated timestamp.
    pub fn with_updated_at(mut self, updated_at: impl Into<String>) -> Self {
        self.updated_at = updated_at.into();
        self
    }

    /// Attach an enrichment metadata field.
    pub fn with_metadata(mut self, name: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(name.into(), value);
        self
    }

    /// Stable identity of this record, if it has one.
    pub fn service_key(&self) -> Option<String> {
        key::service_key(&self.url, &self.title, &self.domain)
    }

    /// Date prefix (`YYYY-MM-DD`) of `updated_at`, if non-empty.
    pub fn updated_date(&self) -> Option<String> {
        let trimmed = self.updated_at.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.get(..10).unwrap_or(trimmed).to_string())
    }

    /// Field-name → value view used for comparison and hashing.
    ///
    /// Absent optional fields are omitted, so callers treat a missing name
    /// as `null`.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(DeclarchError::Serialization {
                message: format!("record serialized to non-object: {}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_round_trips_unknown_fields() {
        let raw = json!({
            "url": "https://a.example/",
            "title": "A",
            "nonConformities": ["1.1.1"],
            "totalNonConformities": 1,
            "updatedAt": "2025-03-01",
            "owner": "Etat A"
        });
        let record: DeclarationRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.metadata.get("owner"), Some(&json!("Etat A")));
        assert!(record.status.is_none());

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["owner"], json!("Etat A"));
        assert!(back.get("status").is_none());
    }

    #[test]
    fn test_with_non_conformities_sorts_and_counts() {
        let record =
            DeclarationRecord::new("https://a.example").with_non_conformities(["2.4.7", "1.1.1", "2.4.7"]);
        assert_eq!(record.non_conformities, vec!["1.1.1", "2.4.7"]);
        assert_eq!(record.total_non_conformities, 2);
        assert_eq!(record.domain, "a.example");
    }

    #[test]
    fn test_updated_date_prefix() {
        let record = DeclarationRecord::new("https://a.example").with_updated_at("2025-03-01T10:00:00Z");
        assert_eq!(record.updated_date().as_deref(), Some("2025-03-01"));
        assert!(DeclarationRecord::new("https://a.example").updated_date().is_none());
    }

    #[test]
    fn test_to_fields_uses_camel_case() {
        let fields = DeclarationRecord::new("https://a.example")
            .with_status("compliant")
            .to_fields()
            .unwrap();
        assert!(fields.contains_key("totalNonConformities"));
        assert_eq!(fields.get("status"), Some(&json!("compliant")));
    }
}
