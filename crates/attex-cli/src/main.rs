//! attex - bulk attachment exporter for Salesforce orgs
//!
//! Extracts attachment metadata through the bulk API into a durable CSV
//! manifest, then downloads every body, resumable from a checkpoint.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "attex")]
#[command(about = "Bulk attachment exporter for Salesforce orgs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./attex.toml or ~/.config/attex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a batch export (extract manifest, then download bodies)
    Export(cmd::export::ExportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(attex_core::ProgressContext::new());

    // Config is loaded before logging is up: the level lives in the config
    // file, with --debug taking precedence.
    let (config, source) = if let Some(path) = &cli.config {
        (Config::from_file(path)?, Some(path.clone()))
    } else {
        Config::load()?
    };

    let level = if cli.debug {
        "debug"
    } else {
        config.export.log_level.as_str()
    };
    let multi = if progress.is_tty() {
        Some(progress.multi())
    } else {
        None
    };
    attex_core::init_logging(level, multi);

    match source {
        Some(path) => log::debug!("loaded config from {}", path.display()),
        None => log::debug!("no config file found, using defaults"),
    }

    match cli.command {
        Command::Export(args) => cmd::export::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec!["Username", &config.salesforce.username]);
            table.add_row(vec!["Login host", &config.login_host()]);
            table.add_row(vec![
                "Output directory",
                &config.export.output_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Manifest CSV",
                &config.manifest_path().display().to_string(),
            ]);
            table.add_row(vec![
                "Layout",
                if config.export.structured {
                    "structured (per parent record)"
                } else {
                    "flat"
                },
            ]);
            table.add_row(vec!["Workers", &config.export.workers.to_string()]);
            table.add_row(vec!["Batch size", &config.export.batch_size.to_string()]);
            table.add_row(vec!["Resume", &config.export.resume.to_string()]);
            table.add_row(vec![
                "Resume checkpoint",
                config.export.resume_at_id.as_deref().unwrap_or("not set"),
            ]);
            table.add_row(vec!["Restriction", &config.restriction_summary()]);
            table.add_row(vec!["Log level", &config.export.log_level]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
