//! Export command
//!
//! Run one export pass over an XML document.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use treetab_core::document::parse_file;
use treetab_core::engine::{ExportEngine, ExportReport};
use treetab_storage::FileSystemSinks;

use super::plan::PlanArgs;

/// Arguments for the export command
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Input XML document
    pub input: PathBuf,

    #[command(flatten)]
    pub plan: PlanArgs,

    /// Print the export report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the export command
pub fn execute(args: ExportArgs, config: Option<&Path>) -> Result<()> {
    let loaded = args.plan.load(config)?;
    let document = parse_file(&args.input)?;

    let opener = FileSystemSinks::new(loaded.config.export.create_dirs);
    let engine = ExportEngine::new(loaded.plan, opener);
    let report = engine
        .run(&document)
        .with_context(|| format!("Export of {} failed", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &ExportReport) {
    use colored::Colorize;

    if report.sinks.is_empty() {
        eprintln!("{} No sinks configured; nothing written.", "⚠".yellow());
        return;
    }

    println!(
        "{} Exported {} rows x {} columns",
        "✓".green(),
        report.rows.to_string().yellow(),
        report.columns.to_string().yellow()
    );
    for sink in &report.sinks {
        println!(
            "  {} {} ({} bytes)",
            sink.format.to_string().cyan(),
            sink.path.display(),
            sink.bytes
        );
    }
}
