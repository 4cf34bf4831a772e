//! Attex Core - shared infrastructure for the attachment export pipeline
//!
//! Everything here is source-agnostic: HTTP plumbing, logging, progress
//! reporting, filename sanitation, and the ordered task queue the download
//! stage pulls from.

pub mod http;
pub mod logging;
pub mod progress;
pub mod sanitize;
pub mod task_queue;

// Re-exports for convenience
pub use http::{http_client, FetchError, SHARED_RUNTIME};
pub use logging::{init_logging, ProgressLogger};
pub use progress::{fmt_num, ProgressContext, SharedProgress};
pub use sanitize::SanitizeMode;
pub use task_queue::TaskQueue;
