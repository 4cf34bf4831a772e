//! Durable CSV manifests for attachment exports.
//!
//! The manifest is the checkpoint of record: extraction streams rows into
//! it once, and every later (re)run replays it instead of re-querying the
//! source system.

pub mod manifest;
pub mod record;

pub use manifest::ManifestStore;
pub use record::{soql_field_list, AttachmentRecord, MANIFEST_FIELDS, RESULTS_FIELDS};
