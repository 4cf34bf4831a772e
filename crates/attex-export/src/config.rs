//! Run configuration for the export pipeline.

use std::path::PathBuf;

use anyhow::{bail, Result};

use attex_core::SanitizeMode;

/// Which slice of the attachment table a run extracts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// Attachments whose parent belongs to one object type, selected by
    /// key-prefix range, optionally AND-ed with a free-form filter clause.
    Object {
        name: String,
        where_clause: Option<String>,
    },
    /// Attachments created inside a date range.
    CreatedBetween { start: String, end: String },
    /// Full-table scan. Expensive, but the remote side enforces its own
    /// row caps, so it is not refused.
    Unrestricted,
}

impl Restriction {
    /// Build from raw configuration values. Exactly one mode may be
    /// configured; conflicts are a startup error, before any I/O.
    pub fn from_options(
        object_name: Option<String>,
        object_where: Option<String>,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Self> {
        if let Some(name) = object_name {
            if start_date.is_some() || end_date.is_some() {
                bail!("restrictions.object_name and restrictions.start_date/end_date are mutually exclusive");
            }
            return Ok(Self::Object {
                name,
                where_clause: object_where,
            });
        }
        if object_where.is_some() {
            bail!("restrictions.object_where requires restrictions.object_name");
        }
        match (start_date, end_date) {
            (Some(start), Some(end)) => Ok(Self::CreatedBetween { start, end }),
            (None, None) => Ok(Self::Unrestricted),
            _ => bail!("restrictions.start_date and restrictions.end_date must both be set"),
        }
    }
}

/// Process-wide run configuration. Read-only after startup.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub manifest_path: PathBuf,
    /// Completed-downloads results CSV.
    pub results_path: PathBuf,
    /// One subdirectory per parent record instead of a flat output dir.
    pub structured: bool,
    /// Concurrent download workers.
    pub workers: usize,
    /// Rows per bulk result page.
    pub batch_size: u32,
    /// Reuse the existing manifest instead of re-extracting.
    pub resume: bool,
    /// Attachment id to resume dispatching at (requires `resume`).
    pub resume_at_id: Option<String>,
    /// Optional filename template with `{id}`, `{parent}`, `{name}`.
    pub filename_pattern: Option<String>,
    pub sanitize: SanitizeMode,
    pub restriction: Restriction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_mode() {
        let r = Restriction::from_options(Some("Account".into()), None, None, None).unwrap();
        assert_eq!(
            r,
            Restriction::Object {
                name: "Account".into(),
                where_clause: None
            }
        );
    }

    #[test]
    fn object_mode_with_clause() {
        let r = Restriction::from_options(
            Some("Case".into()),
            Some("IsClosed = true".into()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            r,
            Restriction::Object {
                name: "Case".into(),
                where_clause: Some("IsClosed = true".into())
            }
        );
    }

    #[test]
    fn date_mode() {
        let r = Restriction::from_options(
            None,
            None,
            Some("2024-01-01T00:00:00Z".into()),
            Some("2024-06-30T23:59:59Z".into()),
        )
        .unwrap();
        assert!(matches!(r, Restriction::CreatedBetween { .. }));
    }

    #[test]
    fn unrestricted_when_nothing_set() {
        let r = Restriction::from_options(None, None, None, None).unwrap();
        assert_eq!(r, Restriction::Unrestricted);
    }

    #[test]
    fn object_and_dates_conflict() {
        let err = Restriction::from_options(
            Some("Account".into()),
            None,
            Some("2024-01-01".into()),
            Some("2024-02-01".into()),
        );
        assert!(err.is_err());
    }

    #[test]
    fn half_open_date_range_rejected() {
        assert!(Restriction::from_options(None, None, Some("2024-01-01".into()), None).is_err());
        assert!(Restriction::from_options(None, None, None, Some("2024-02-01".into())).is_err());
    }

    #[test]
    fn where_clause_without_object_rejected() {
        assert!(
            Restriction::from_options(None, Some("IsClosed = true".into()), None, None).is_err()
        );
    }
}
