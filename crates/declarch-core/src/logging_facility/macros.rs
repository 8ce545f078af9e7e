//! Operation boundary macros.
//!
//! Every logged operation emits a `start` event and then either `end` or
//! `end_error`, each tagged with `component` (the calling module), `op` and
//! `event`. Field names come from `declarch_core_types::schema`.

#[doc(hidden)]
#[macro_export]
macro_rules! __op_boundary {
    ($level:ident, $op:expr, $event:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = module_path!(),
            op = $op,
            event = $event,
            $($($field)*)?
        )
    };
}

/// Log the start of an operation.
///
/// ```
/// # use declarch_core::log_op_start;
/// log_op_start!("detect");
/// log_op_start!("detect", record_count = 12);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__op_boundary!(
            info,
            $op,
            declarch_core_types::schema::EVENT_START
            $(, $($field)*)?
        )
    };
}

/// Log the successful end of an operation. `duration_ms` is required.
///
/// ```
/// # use declarch_core::log_op_end;
/// log_op_end!("detect", duration_ms = 42, event_count = 3);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__op_boundary!(
            info,
            $op,
            declarch_core_types::schema::EVENT_END,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Log a failed operation with the error's kind and stable code.
///
/// `$err` is anything convertible into `ExError`.
///
/// ```
/// # use declarch_core::{log_op_error, errors::DeclarchError};
/// let err = DeclarchError::InvalidInput { reason: "empty".to_string() };
/// log_op_error!("ingest", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__op_boundary!(
            error,
            $op,
            declarch_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            err = %ex_err
            $(, $($field)*)?
        )
    }};
}
