//! Change detection between a baseline and a current snapshot.
//!
//! ## Entry point
//!
//! ```ignore
//! use declarch_core::detect::ChangeDetector;
//!
//! let events = ChangeDetector::default().detect(&baseline, &current, now)?;
//! ```
//!
//! ## Guarantees
//!
//! - **Determinism**: identical inputs produce identical events in service-key order.
//! - **Volatile-field suppression**: a record whose only difference is a
//!   volatile field (by default `updatedAt`) produces no event.
//! - **Stable identity**: the fingerprint ignores detection time and volatile
//!   fields, so re-detecting the same change on a later run yields the same
//!   fingerprint.

pub mod engine;
pub mod fingerprint;

pub use engine::{ChangeDetector, DEFAULT_VOLATILE_FIELDS};
pub use fingerprint::{compute_fingerprint, compute_record_digest};
