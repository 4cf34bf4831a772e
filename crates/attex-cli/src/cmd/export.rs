//! Export subcommand - run the batch export pipeline

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use attex_core::{fmt_num, SharedProgress};
use attex_export::Summary;
use attex_sfdc::Session;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Filename pattern override with {id}, {parent}, {name} placeholders,
    /// e.g. "{parent}-{id}-{name}". All other settings come from the
    /// config file.
    #[arg(short = 'f', long)]
    pub filename_pattern: Option<String>,
}

pub fn run(args: ExportArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    config.validate()?;
    let export_config = config.export_config(args.filename_pattern)?;

    log::info!("exporting attachments from Salesforce");
    log::info!("  user: {}", config.salesforce.username);
    log::info!("  signing in at https://{}", config.login_host());
    log::info!("  output: {}", export_config.output_dir.display());

    let session =
        Session::login(&config.credentials()).context("could not establish session")?;

    let summary = attex_export::run(&export_config, &session, progress)?;

    print_summary(&summary);

    // per-record failures are already logged; they never change the exit code
    Ok(())
}

/// Key-value summary table on stderr, after the bars are gone.
fn print_summary(summary: &Summary) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Export").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    table.add_row(vec!["Manifest rows", &fmt_num(summary.total_rows)]);
    table.add_row(vec![
        "Skipped (before checkpoint)",
        &fmt_num(summary.skipped),
    ]);
    table.add_row(vec!["Downloaded", &fmt_num(summary.downloaded)]);
    table.add_row(vec!["Failed", &fmt_num(summary.failed)]);
    table.add_row(vec![
        "Time",
        &format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ]);
    eprintln!("\n{table}");
}
