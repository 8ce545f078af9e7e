//! Field and event names shared by every structured log line.
//!
//! The logging macros write these names as identifiers; the constants let
//! consumers (log capture, JSON log processors) match on them.

pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_ERR_CODE: &str = "err_code";
pub const FIELD_RUN_ID: &str = "run_id";

pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

/// Whether `event` closes an operation
pub fn is_terminal_event(event: &str) -> bool {
    event == EVENT_END || event == EVENT_END_ERROR
}
