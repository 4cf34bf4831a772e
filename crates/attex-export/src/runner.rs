//! Run orchestration: extract (unless resuming), replay, dispatch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{bail, Context, Result};

use attex_core::{fmt_num, SharedProgress, TaskQueue};
use attex_sfdc::Session;
use attex_store::{AttachmentRecord, ManifestStore, RESULTS_FIELDS};

use crate::config::ExportConfig;
use crate::download::{self, DownloadTask, Layout};
use crate::extract;
use crate::resume::ResumeFilter;

/// Pipeline execution summary
#[derive(Debug)]
pub struct Summary {
    pub total_rows: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub elapsed: std::time::Duration,
}

/// Run the full export: extraction stage (unless resuming), then manifest
/// replay through the download workers.
///
/// Per-record failures are logged and never abort the run; every fatal
/// path (config, auth, query, manifest I/O) propagates out.
pub fn run(config: &ExportConfig, session: &Session, progress: &SharedProgress) -> Result<Summary> {
    let start = Instant::now();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    if config.resume {
        log::info!(
            "resuming: reusing manifest {}",
            config.manifest_path.display()
        );
    } else {
        extract::run_extraction(session, config, progress)?;
    }

    // Replay the manifest in file order. The checkpoint only applies when
    // resuming; a fresh extraction always dispatches from the first row.
    let manifest = ManifestStore::open(&config.manifest_path);
    let checkpoint = if config.resume {
        config.resume_at_id.clone()
    } else {
        None
    };
    let mut filter = ResumeFilter::new(checkpoint);

    let mut records: Vec<AttachmentRecord> = Vec::new();
    let mut malformed = 0usize;
    for row in manifest.read_all::<AttachmentRecord>()? {
        match row {
            Ok(record) => {
                if filter.admit(&record) {
                    records.push(record);
                }
            }
            Err(e) => {
                // a crash mid-append can leave a torn final row
                malformed += 1;
                log::warn!("skipping malformed manifest row: {e}");
            }
        }
    }
    if malformed > 0 {
        log::warn!("{malformed} malformed manifest rows skipped");
    }

    if config.resume && !filter.checkpoint_found() {
        if let Some(id) = &config.resume_at_id {
            bail!(
                "resume checkpoint {id} never appeared in manifest {}; no downloads dispatched",
                config.manifest_path.display()
            );
        }
    }

    let skipped = filter.skipped();
    let queue = TaskQueue::new(records);
    let total = queue.total();
    log::info!(
        "dispatching {} rows ({} skipped before checkpoint)",
        fmt_num(total),
        fmt_num(skipped)
    );

    // Fresh runs restart the results file alongside the manifest; resumed
    // runs keep appending to it.
    let results = if config.resume {
        ManifestStore::open_or_create(&config.results_path, &RESULTS_FIELDS)?
    } else {
        ManifestStore::create(&config.results_path, &RESULTS_FIELDS)?
    };

    let layout = if config.structured {
        Layout::Structured
    } else {
        Layout::Flat
    };
    let workers = config.workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("failed to create worker pool")?;

    let bar = progress.download_bar(total as u64);
    let downloaded = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    pool.scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|_| {
                while let Some(record) = queue.next() {
                    let task = DownloadTask {
                        record,
                        output_root: &config.output_dir,
                        layout,
                        filename_pattern: config.filename_pattern.as_deref(),
                        sanitize: config.sanitize,
                    };
                    match download::download(&task, session) {
                        Ok(path) => {
                            log::debug!("saved {} to {}", record.id, path.display());
                            let saved = path.to_string_lossy();
                            if let Err(e) = results.append_row([
                                record.id.as_str(),
                                record.parent_id.as_str(),
                                saved.as_ref(),
                            ]) {
                                log::error!("failed to record completion of {}: {e}", record.id);
                            }
                            downloaded.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            log::warn!("{e}");
                        }
                    }
                    bar.inc(1);
                }
            });
        }
    });
    bar.finish_and_clear();

    let summary = Summary {
        total_rows: total,
        skipped,
        downloaded: downloaded.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
    };

    log::info!(
        "downloads: {}/{} completed ({} failed)",
        fmt_num(summary.downloaded),
        fmt_num(summary.total_rows),
        fmt_num(summary.failed)
    );
    log::info!("time: {:.1}s", summary.elapsed.as_secs_f64());

    Ok(summary)
}
