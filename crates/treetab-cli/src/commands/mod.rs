//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod check;
pub mod export;
pub mod init;
pub mod plan;

use clap::{Parser, Subcommand};

/// treetab - export selected parts of XML documents as tables
#[derive(Debug, Parser)]
#[command(name = "treetab")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Export a document to the configured sinks
    Export(export::ExportArgs),

    /// Validate configuration and preview an export
    Check(check::CheckArgs),

    /// Write a starter treetab.toml
    Init(init::InitArgs),
}

/// Run the CLI application
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    // Handle color output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Export(args) => export::execute(args, config),
        Commands::Check(args) => check::execute(args, config),
        Commands::Init(args) => init::execute(args),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_text() {
        let cmd = Cli::command();
        assert!(cmd.get_about().is_some());
    }

    #[test]
    fn test_export_flags() {
        let cli = Cli::try_parse_from([
            "treetab",
            "-vv",
            "export",
            "in.xml",
            "--set",
            "run=7",
            "--sink",
            "a.csv",
            "--sink",
            "b.bin",
            "--column",
            "//v=V",
            "--strict",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Export(args) = cli.command else {
            panic!("expected export");
        };
        assert_eq!(args.plan.sinks, vec!["a.csv", "b.bin"]);
        assert_eq!(args.plan.set, vec![("run".to_string(), "7".to_string())]);
        assert!(args.plan.strict);
        assert!(args.json);
    }

    #[test]
    fn test_set_requires_key_value() {
        assert!(Cli::try_parse_from(["treetab", "export", "in.xml", "--set", "oops"]).is_err());
    }
}
