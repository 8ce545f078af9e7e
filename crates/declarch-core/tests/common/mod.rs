use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use declarch_core::{DeclarationRecord, Snapshot};

/// Detection instant used across tests
#[allow(dead_code)]
pub fn detected_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Record for `https://<name>.example/` with a status
#[allow(dead_code)]
pub fn service(name: &str, status: &str) -> DeclarationRecord {
    DeclarationRecord::new(format!("https://{}.example/", name))
        .with_title(format!("Service {}", name))
        .with_status(status)
}

#[allow(dead_code)]
pub fn snapshot(records: Vec<DeclarationRecord>) -> Snapshot {
    Snapshot::from_records(Some(date("2025-03-01")), records)
}

#[allow(dead_code)]
pub fn key_of(name: &str) -> String {
    format!("url::https://{}.example/", name)
}
