pub mod diff;
pub mod log;
pub mod run;

use declarch_core::{ChangeEvent, ChangeKind};

/// One-line human summary of an event
pub fn describe(event: &ChangeEvent) -> String {
    let mut line = format!(
        "{} {} {}",
        event.detected_date, event.kind, event.service_key
    );
    if event.kind == ChangeKind::Modified {
        line.push_str(&format!(" [{}]", event.changed_fields().join(", ")));
    }
    if !event.added.is_empty() {
        line.push_str(&format!(" +wcag {}", event.added.join(",")));
    }
    if !event.removed.is_empty() {
        line.push_str(&format!(" -wcag {}", event.removed.join(",")));
    }
    line
}

/// Print events as JSON lines or human summaries
pub fn print_events(events: &[ChangeEvent], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}", describe(event));
        }
    }
    Ok(())
}
