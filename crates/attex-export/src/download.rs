//! Per-record download worker.

use std::path::{Path, PathBuf};

use attex_core::{FetchError, SanitizeMode};
use attex_sfdc::{rest, Session};
use attex_store::AttachmentRecord;

/// Output organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One subdirectory per parent record.
    Structured,
    /// Everything in the output directory, parent id in the filename.
    Flat,
}

/// One unit of download work: a manifest row plus the run's output policy.
#[derive(Debug)]
pub struct DownloadTask<'a> {
    pub record: &'a AttachmentRecord,
    pub output_root: &'a Path,
    pub layout: Layout,
    pub filename_pattern: Option<&'a str>,
    pub sanitize: SanitizeMode,
}

impl DownloadTask<'_> {
    /// Resolve the target path. Pure: no filesystem access.
    pub fn resolve_path(&self) -> PathBuf {
        let safe_name = self.sanitize.sanitize(&self.record.name);
        let filename = match self.filename_pattern {
            Some(pattern) => apply_pattern(pattern, self.record, &safe_name),
            None => match self.layout {
                Layout::Structured => format!("{}_{safe_name}", self.record.id),
                Layout::Flat => {
                    format!("{}_{}_{safe_name}", self.record.parent_id, self.record.id)
                }
            },
        };
        match self.layout {
            Layout::Structured => self
                .output_root
                .join(&self.record.parent_id)
                .join(filename),
            Layout::Flat => self.output_root.join(filename),
        }
    }
}

/// Fill a filename template. The pattern replaces only the filename; the
/// layout still decides the directory.
fn apply_pattern(pattern: &str, record: &AttachmentRecord, safe_name: &str) -> String {
    pattern
        .replace("{id}", &record.id)
        .replace("{parent}", &record.parent_id)
        .replace("{name}", safe_name)
}

/// Per-record failure. The runner logs it and moves on to the next
/// manifest row; it never aborts the run.
#[derive(Debug)]
pub enum DownloadError {
    /// Body fetch failed; carries the requested URL.
    Fetch { url: String, source: FetchError },
    /// Local write failed after a successful fetch.
    Io(std::io::Error),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { url, source } => write!(f, "failed to download {url}: {source}"),
            Self::Io(e) => write!(f, "failed to write attachment: {e}"),
        }
    }
}

impl std::error::Error for DownloadError {}

/// Fetch one attachment body and write it to the resolved path.
///
/// The body is fetched before anything touches the filesystem, so a failed
/// fetch leaves no file behind. An existing file at the path is
/// overwritten; a re-run of the same manifest row converges on one file.
pub fn download(task: &DownloadTask, session: &Session) -> Result<PathBuf, DownloadError> {
    let path = task.resolve_path();
    let url = rest::body_url(session, &task.record.id);
    log::debug!("downloading from {url}");

    let body =
        rest::fetch_body(session, &url).map_err(|source| DownloadError::Fetch { url, source })?;

    if let Some(dir) = path.parent() {
        // workers for the same parent may race here; already-exists is success
        std::fs::create_dir_all(dir).map_err(DownloadError::Io)?;
    }
    std::fs::write(&path, &body).map_err(DownloadError::Io)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parent: &str, name: &str) -> AttachmentRecord {
        AttachmentRecord {
            id: id.to_string(),
            parent_id: parent.to_string(),
            name: name.to_string(),
            is_private: false,
            content_type: "application/octet-stream".to_string(),
            body_length: 4,
            owner_id: "005000000000001".to_string(),
            created_date: "2024-01-01T00:00:00.000Z".to_string(),
            created_by_id: "005000000000001".to_string(),
            last_modified_date: "2024-01-01T00:00:00.000Z".to_string(),
            last_modified_by_id: "005000000000001".to_string(),
            system_modstamp: "2024-01-01T00:00:00.000Z".to_string(),
            description: String::new(),
            is_partner_shared: false,
        }
    }

    fn task<'a>(
        record: &'a AttachmentRecord,
        root: &'a Path,
        layout: Layout,
        pattern: Option<&'a str>,
    ) -> DownloadTask<'a> {
        DownloadTask {
            record,
            output_root: root,
            layout,
            filename_pattern: pattern,
            sanitize: SanitizeMode::Restrictive,
        }
    }

    #[test]
    fn structured_path_is_parent_subdir() {
        let rec = record("attach1", "parent1", "Notes.txt");
        let t = task(&rec, Path::new("/out"), Layout::Structured, None);
        assert_eq!(
            t.resolve_path(),
            PathBuf::from("/out/parent1/attach1_Notes.txt")
        );
    }

    #[test]
    fn flat_path_prefixes_parent_and_id() {
        let rec = record("attach1", "parent1", "Notes.txt");
        let t = task(&rec, Path::new("/out"), Layout::Flat, None);
        assert_eq!(
            t.resolve_path(),
            PathBuf::from("/out/parent1_attach1_Notes.txt")
        );
    }

    #[test]
    fn name_is_sanitized_in_path() {
        let rec = record("attach1", "parent1", "Report, Q1.pdf");
        let t = task(&rec, Path::new("/out"), Layout::Structured, None);
        assert_eq!(
            t.resolve_path(),
            PathBuf::from("/out/parent1/attach1_Report_ Q1.pdf")
        );
    }

    #[test]
    fn pattern_overrides_filename_not_directory() {
        let rec = record("attach1", "parent1", "Notes.txt");
        let t = task(
            &rec,
            Path::new("/out"),
            Layout::Structured,
            Some("{parent}-{id}-{name}"),
        );
        assert_eq!(
            t.resolve_path(),
            PathBuf::from("/out/parent1/parent1-attach1-Notes.txt")
        );
    }

    #[test]
    fn pattern_receives_sanitized_name() {
        let rec = record("attach1", "parent1", "bad*name?.txt");
        let t = task(&rec, Path::new("/out"), Layout::Flat, Some("{name}"));
        assert_eq!(t.resolve_path(), PathBuf::from("/out/bad_name_.txt"));
    }

    #[test]
    fn fetch_error_display_carries_url() {
        let err = DownloadError::Fetch {
            url: "https://x/sobjects/Attachment/attach2/Body".to_string(),
            source: FetchError::Http {
                status: Some(404),
                message: "body fetch returned 404".to_string(),
            },
        };
        let msg = format!("{err}");
        assert!(msg.contains("attach2/Body"));
        assert!(msg.contains("404"));
    }
}
