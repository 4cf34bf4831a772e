//! Bulk metadata extraction into the manifest.
//!
//! One bulk query per run. Result pages are appended to the manifest as
//! they arrive; each page's own header line is stripped so the file stays
//! a single CSV document under the header written by `create`.

use anyhow::Result;

use attex_core::{fmt_num, SharedProgress};
use attex_sfdc::{rest, QueryJob, Session};
use attex_store::{soql_field_list, ManifestStore, MANIFEST_FIELDS};

use crate::config::{ExportConfig, Restriction};

#[derive(Debug, Default)]
pub struct ExtractionStats {
    pub pages: usize,
    /// Lines appended; an upper bound on rows (quoted fields may embed
    /// newlines).
    pub lines: usize,
}

/// Build the attachment SOQL for a restriction.
///
/// `key_prefix` must be the resolved prefix when the restriction is
/// object-scoped. Results are ordered by creation timestamp, the sort the
/// resume controller relies on for deterministic checkpointing.
pub fn build_query(restriction: &Restriction, key_prefix: Option<&str>) -> String {
    let mut soql = format!("SELECT {} FROM Attachment", soql_field_list());
    match restriction {
        Restriction::Object { where_clause, .. } => {
            let prefix = key_prefix.expect("object restriction requires a resolved key prefix");
            soql.push_str(&format!(
                " WHERE ParentId > '{prefix}{}' AND ParentId < '{prefix}{}'",
                "0".repeat(15),
                "9".repeat(15),
            ));
            if let Some(clause) = where_clause {
                soql.push_str(" AND ");
                soql.push_str(clause);
            }
        }
        Restriction::CreatedBetween { start, end } => {
            soql.push_str(&format!(
                " WHERE CreatedDate >= {start} AND CreatedDate <= {end}"
            ));
        }
        Restriction::Unrestricted => {}
    }
    soql.push_str(" ORDER BY CreatedDate");
    soql
}

/// Run the extraction stage: create the manifest and stream every bulk
/// result page into it. Skipped entirely by the runner when resuming.
pub fn run_extraction(
    session: &Session,
    config: &ExportConfig,
    progress: &SharedProgress,
) -> Result<ExtractionStats> {
    let key_prefix = match &config.restriction {
        Restriction::Object { name, .. } => {
            let prefix = rest::key_prefix(session, name)?;
            log::info!("object {name} has key prefix {prefix}");
            Some(prefix)
        }
        _ => None,
    };
    let soql = build_query(&config.restriction, key_prefix.as_deref());
    log::debug!("extraction query: {soql}");

    let store = ManifestStore::create(&config.manifest_path, &MANIFEST_FIELDS)?;

    let status = progress.stage_line("extract");
    status.set_message("submitting bulk query...");
    let job = QueryJob::submit(session, &soql)?;
    status.set_message(format!("waiting for job {}", job.id()));
    job.wait()?;

    let mut stats = ExtractionStats::default();
    for page in job.pages(config.batch_size) {
        stats.lines += store.append_page(&page?)?;
        stats.pages += 1;
        status.set_message(format!(
            "{} rows from {} pages",
            fmt_num(stats.lines),
            stats.pages
        ));
    }
    status.finish_and_clear();

    log::info!(
        "extraction wrote {} manifest lines from {} pages",
        fmt_num(stats.lines),
        stats.pages
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_query_uses_prefix_range() {
        let r = Restriction::Object {
            name: "Account".into(),
            where_clause: None,
        };
        let soql = build_query(&r, Some("001"));
        assert!(soql.contains("WHERE ParentId > '001000000000000000'"));
        assert!(soql.contains("AND ParentId < '001999999999999999'"));
        assert!(soql.ends_with(" ORDER BY CreatedDate"));
    }

    #[test]
    fn object_query_appends_free_clause() {
        let r = Restriction::Object {
            name: "Case".into(),
            where_clause: Some("IsClosed = true".into()),
        };
        let soql = build_query(&r, Some("500"));
        assert!(soql.contains("' AND IsClosed = true ORDER BY CreatedDate"));
    }

    #[test]
    fn date_query_uses_created_bounds() {
        let r = Restriction::CreatedBetween {
            start: "2024-01-01T00:00:00Z".into(),
            end: "2024-06-30T23:59:59Z".into(),
        };
        let soql = build_query(&r, None);
        assert!(soql.contains(
            "WHERE CreatedDate >= 2024-01-01T00:00:00Z AND CreatedDate <= 2024-06-30T23:59:59Z"
        ));
        assert!(soql.ends_with(" ORDER BY CreatedDate"));
    }

    #[test]
    fn unrestricted_query_has_no_where() {
        let soql = build_query(&Restriction::Unrestricted, None);
        assert!(!soql.contains("WHERE"));
        assert!(soql.starts_with("SELECT Id, ParentId, Name"));
        assert!(soql.ends_with(" ORDER BY CreatedDate"));
    }
}
