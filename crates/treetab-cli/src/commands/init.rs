//! Init command
//!
//! Write a starter treetab.toml.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

use super::plan::CONFIG_FILE;

/// Arguments for the init command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing configuration without asking
    #[arg(long)]
    pub force: bool,
}

const TEMPLATE: &str = r#"# treetab configuration

[export]
# "lenient" pads short columns; "strict" requires equal lengths and labels
mode = "lenient"
# "lf", "crlf" or "platform"
line_terminator = "platform"
create_dirs = true
# Children of this root element become context variables
context_element = "context"

# Extra extension aliases
[export.extensions]
# dat = "fixed-width-binary"

[context]
out_dir = "out"

[[sink]]
path = "${out_dir}/table.csv"

[[sink]]
path = "${out_dir}/table.bin"

[[column]]
select = "//sample/value"
label = "Value"

# One column per matched element, cells selected relative to it
# [[column]]
# select = "//column"
# cells = "*"
# label_attribute = "label"
"#;

/// Execute the init command
pub fn execute(args: InitArgs) -> Result<()> {
    use colored::Colorize;

    let dir = match args.path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() {
        if !args.force {
            use dialoguer::Confirm;

            let confirmed = Confirm::new()
                .with_prompt(format!("Overwrite {}?", config_path.display()))
                .default(false)
                .interact()?;

            if !confirmed {
                println!("Init cancelled.");
                return Ok(());
            }
        }

        let backup = backup(&config_path)?;
        println!("{} Backed up to {}", "✓".green(), backup.display());
    }

    fs::create_dir_all(&dir).context(format!("Failed to create {}", dir.display()))?;
    fs::write(&config_path, TEMPLATE)
        .context(format!("Failed to write {}", config_path.display()))?;
    println!("{} Wrote {}", "✓".green(), config_path.display());

    println!("\n{}", "Next steps:".bold());
    println!("  1. Edit the sinks and columns in {}", CONFIG_FILE);
    println!("  2. Preview an export:");
    println!("     {}", "treetab check input.xml".cyan());
    println!("  3. Run it:");
    println!("     {}", "treetab export input.xml".cyan());

    Ok(())
}

fn backup(path: &Path) -> Result<PathBuf> {
    let backup = PathBuf::from(format!(
        "{}.backup-{}",
        path.display(),
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));
    fs::copy(path, &backup).context(format!("Failed to back up {}", path.display()))?;
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treetab_core::config::Config;

    #[test]
    fn test_template_is_valid_config() {
        let config = Config::from_toml_str(TEMPLATE).unwrap();
        assert_eq!(config.sinks.len(), 2);
        assert_eq!(config.columns.len(), 1);
        for column in &config.columns {
            column.compile().unwrap();
        }
    }

    #[test]
    fn test_force_backs_up_existing() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "# mine\n").unwrap();

        execute(InitArgs {
            path: Some(temp.path().to_path_buf()),
            force: true,
        })
        .unwrap();

        let backups: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup-"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(backups[0].path()).unwrap(), "# mine\n");
        assert_eq!(
            fs::read_to_string(temp.path().join(CONFIG_FILE)).unwrap(),
            TEMPLATE
        );
    }
}
