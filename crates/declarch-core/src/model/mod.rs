//! Domain model for the declaration archive.

pub mod change;
pub mod key;
pub mod record;
pub mod snapshot;

pub use change::{ChangeEvent, ChangeKind, FieldChange};
pub use key::{canonical_url, domain_of, service_key};
pub use record::DeclarationRecord;
pub use snapshot::Snapshot;
