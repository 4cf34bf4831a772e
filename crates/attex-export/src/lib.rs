//! The export pipeline.
//!
//! Two stages: bulk metadata extraction streaming query results into a
//! durable CSV manifest, then checkpointed replay of that manifest through
//! the download workers. The manifest is written once per run (or reused
//! as-is when resuming) so millions of rows never get re-queried.

pub mod config;
pub mod download;
pub mod extract;
pub mod resume;
pub mod runner;

pub use config::{ExportConfig, Restriction};
pub use download::{DownloadError, DownloadTask, Layout};
pub use runner::{run, Summary};
