//! Structured logging shared by every declarch crate.
//!
//! Operations log a `start` and exactly one of `end` / `end_error` through
//! the `log_op_*` macros, each tagged with `component` and `op`. Binaries
//! pick an output [`Profile`] once at startup; tests install an in-memory
//! layer with [`init_test_capture`] and assert on what was emitted.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
