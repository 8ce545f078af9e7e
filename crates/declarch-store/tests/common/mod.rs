#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use declarch_core::{ChangeDetector, ChangeEvent, DeclarationRecord, Snapshot};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn detected_at(day: &str) -> DateTime<Utc> {
    let d = date(day);
    Utc.from_utc_datetime(&d.and_hms_opt(6, 0, 0).unwrap())
}

pub fn service(name: &str, status: &str) -> DeclarationRecord {
    DeclarationRecord::new(format!("https://{}.example/", name))
        .with_title(format!("Service {}", name))
        .with_status(status)
}

pub fn snapshot(records: Vec<DeclarationRecord>) -> Snapshot {
    Snapshot::from_records(None, records)
}

pub fn key_of(name: &str) -> String {
    format!("url::https://{}.example/", name)
}

pub fn detect(baseline: &Snapshot, current: &Snapshot, day: &str) -> Vec<ChangeEvent> {
    ChangeDetector::default()
        .detect(baseline, current, detected_at(day))
        .unwrap()
}
