//! Plan loading shared by export and check
//!
//! Configuration comes from `--config`, `./treetab.toml` or the per-user
//! config directory, in that order; command-line flags are layered on top.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use treetab_core::config::{ColumnConfig, Config, SinkConfig};
use treetab_core::context::RuntimeContext;
use treetab_core::engine::ExportPlan;
use treetab_core::table::TableMode;

/// Local configuration file name
pub const CONFIG_FILE: &str = "treetab.toml";

/// Arguments that shape an export plan
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Set a context variable, overriding config and document values
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Require equal-length, labeled columns
    #[arg(long)]
    pub strict: bool,

    /// Directory relative sink paths resolve against (default: current directory)
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Additional sink pathname template
    #[arg(long = "sink", value_name = "PATH")]
    pub sinks: Vec<String>,

    /// Additional column selector, optionally labeled
    #[arg(long = "column", value_name = "EXPR[=LABEL]")]
    pub columns: Vec<String>,
}

/// A plan together with the configuration it was built from
pub struct LoadedPlan {
    pub config: Config,
    pub source: Option<PathBuf>,
    pub plan: ExportPlan,
}

impl PlanArgs {
    /// Load configuration, apply overrides and build the plan
    pub fn load(&self, explicit: Option<&Path>) -> Result<LoadedPlan> {
        let source = find_config(explicit)?;
        let mut config = match &source {
            Some(path) => {
                info!("Using configuration {}", path.display());
                Config::load(path)?
            }
            None => {
                debug!("No configuration file found, using defaults");
                Config::default()
            }
        };

        if self.strict {
            config.export.mode = TableMode::Strict;
        }
        config
            .sinks
            .extend(self.sinks.iter().map(|path| SinkConfig::new(path.as_str())));
        config
            .columns
            .extend(self.columns.iter().map(|arg| parse_column(arg)));

        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let mut context = RuntimeContext::new(base_dir);
        for (key, value) in &self.set {
            context.set_override(key.as_str(), value.as_str());
        }

        let plan = ExportPlan::from_config(&config, context).context("Invalid export plan")?;
        Ok(LoadedPlan {
            config,
            source,
            plan,
        })
    }
}

/// Locate the configuration file to use, if any
pub fn find_config(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(user_config_path().filter(|path| path.exists()))
}

/// Per-user configuration file
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "treetab", "treetab")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Parse `KEY=VALUE`
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Parse `EXPR[=LABEL]`
///
/// The text after the last `=` is a label only if it could not be part of a
/// predicate, so `//v[@kind='a']` stays a bare expression.
pub fn parse_column(arg: &str) -> ColumnConfig {
    match arg.rsplit_once('=') {
        Some((expr, label))
            if !expr.is_empty()
                && !label.is_empty()
                && !label.contains(|c: char| "'\"[]/@".contains(c)) =>
        {
            ColumnConfig::new(expr).label(label)
        }
        _ => ColumnConfig::new(arg),
    }
}
