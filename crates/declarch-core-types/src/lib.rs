//! Core types shared across declarch crates
//!
//! This crate provides foundational types used by the error, logging and
//! archive facilities:
//!
//! - **Correlation types**: RunId, RunContext
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;

pub use correlation::{RunContext, RunId};
