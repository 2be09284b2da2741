//! Check command
//!
//! Validate configuration and, given a document, show what an export would
//! write without opening any sink.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use treetab_core::document::parse_file;
use treetab_core::engine::ExportPreview;
use treetab_core::sink::SinkDescriptor;

use super::plan::PlanArgs;

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Input XML document to evaluate against
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub plan: PlanArgs,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ColumnSummary {
    label: String,
    len: usize,
}

#[derive(Debug, Serialize)]
struct CheckSummary {
    config: Option<PathBuf>,
    sinks: Vec<SinkDescriptor>,
    columns: Vec<ColumnSummary>,
    rows: usize,
}

impl CheckSummary {
    fn from_preview(config: Option<PathBuf>, preview: ExportPreview) -> Self {
        let columns = preview
            .table
            .labels()
            .iter()
            .zip(preview.table.columns())
            .map(|(label, column)| ColumnSummary {
                label: label.clone(),
                len: column.len(),
            })
            .collect();
        Self {
            config,
            rows: preview.table.row_count(),
            sinks: preview.sinks,
            columns,
        }
    }
}

/// Execute the check command
pub fn execute(args: CheckArgs, config: Option<&Path>) -> Result<()> {
    use colored::Colorize;

    let loaded = args.plan.load(config)?;
    let source = loaded.source.clone();

    let Some(input) = &args.input else {
        if args.json {
            let templates = serde_json::json!({
                "config": source,
                "sinks": loaded.plan.sink_templates(),
                "columns": loaded.plan.columns().iter().map(|c| c.expr()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&templates)?);
            return Ok(());
        }
        print_source(source.as_deref());
        println!("{}", "Sinks:".bold());
        for template in loaded.plan.sink_templates() {
            println!("  {}", template);
        }
        println!("{}", "Columns:".bold());
        for column in loaded.plan.columns() {
            println!("  {}", column.expr());
        }
        return Ok(());
    };

    let document = parse_file(input)?;
    let summary = CheckSummary::from_preview(source, loaded.plan.preview(&document)?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    print_source(summary.config.as_deref());
    println!("{}", "Sinks:".bold());
    for sink in &summary.sinks {
        println!(
            "  {} {}",
            sink.format().to_string().cyan(),
            sink.path().display()
        );
    }
    println!("{} ({} rows)", "Columns:".bold(), summary.rows);
    for column in &summary.columns {
        let short = column.len < summary.rows;
        let len = if short {
            column.len.to_string().yellow()
        } else {
            column.len.to_string().normal()
        };
        println!("  {} {}", column.label, len);
    }

    Ok(())
}

fn print_source(source: Option<&Path>) {
    use colored::Colorize;

    match source {
        Some(path) => println!("{} Configuration {} is valid", "✓".green(), path.display()),
        None => println!("{} No configuration file, using defaults", "✓".green()),
    }
}
