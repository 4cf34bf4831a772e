//! Append-only CSV manifest file.
//!
//! Appends open, write, and close the file per call so a crash mid-run
//! loses at most the in-flight row. The append lock is held only for the
//! duration of one append, never across network I/O.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

/// File-backed ordered sequence of CSV rows with a single header row.
pub struct ManifestStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ManifestStore {
    /// Create a fresh manifest with a fully-quoted header row.
    ///
    /// Destructive: truncates any existing file. Callers gate this behind
    /// "not resuming".
    pub fn create(path: impl Into<PathBuf>, header: &[&str]) -> Result<Self> {
        let path = path.into();
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_path(&path)
            .with_context(|| format!("failed to create manifest {}", path.display()))?;
        writer
            .write_record(header)
            .and_then(|()| writer.flush().map_err(Into::into))
            .with_context(|| format!("failed to write manifest header {}", path.display()))?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Attach to an existing manifest without touching it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Attach to an existing file, or create it with `header` if absent.
    /// Resume-safe for the results file: prior rows are kept.
    pub fn open_or_create(path: impl Into<PathBuf>, header: &[&str]) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            Ok(Self::open(path))
        } else {
            Self::create(path, header)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one fully-quoted CSV record. Thread-safe.
    pub fn append_row<I, S>(&self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let _guard = self.lock.lock().expect("manifest lock poisoned");
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open manifest {} for append", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(file);
        writer
            .write_record(fields)
            .and_then(|()| writer.flush().map_err(Into::into))
            .with_context(|| format!("failed to append to manifest {}", self.path.display()))?;
        Ok(())
    }

    /// Append one bulk result page, skipping its leading header line.
    ///
    /// The data lines are written verbatim; every page is already CSV in
    /// the manifest's own column order. Returns the number of lines
    /// appended (an upper bound on rows: quoted fields may embed newlines).
    pub fn append_page(&self, page: &str) -> Result<usize> {
        let Some((_header, data)) = page.split_once('\n') else {
            return Ok(0);
        };
        let data = data.trim_end_matches(['\r', '\n']);
        if data.is_empty() {
            return Ok(0);
        }

        let _guard = self.lock.lock().expect("manifest lock poisoned");
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open manifest {} for append", self.path.display()))?;
        file.write_all(data.as_bytes())
            .and_then(|()| file.write_all(b"\n"))
            .with_context(|| format!("failed to append page to {}", self.path.display()))?;
        Ok(data.lines().count())
    }

    /// Lazy iterator over data rows in file order (header skipped).
    ///
    /// Fails if the manifest does not exist; row-level decode errors
    /// surface per item so callers can decide (a torn final row from a
    /// crashed run is skippable, not fatal).
    pub fn read_all<T: DeserializeOwned>(
        &self,
    ) -> Result<impl Iterator<Item = csv::Result<T>>> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("failed to read manifest {}", self.path.display()))?;
        Ok(reader.into_deserialize())
    }
}
