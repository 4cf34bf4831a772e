//! Minimal Salesforce client.
//!
//! Exactly the three collaborator capabilities the export pipeline needs:
//! a synchronous SOQL query, a bulk paged query for large extractions, and
//! an authenticated fetch of one attachment's binary body. Authentication
//! protocol internals, retries, and the query engine stay on the remote
//! side.

pub mod bulk;
pub mod rest;
pub mod session;

pub use bulk::QueryJob;
pub use session::{Credentials, Session, API_VERSION};
