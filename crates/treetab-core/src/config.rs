//! Configuration management for treetab

use crate::column::{ColumnGroup, ColumnSelector, ColumnSource, LabelRule};
use crate::error::{Result, TreetabError};
use crate::format::{Format, LineTerminator};
use crate::selector::Selector;
use crate::table::TableMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export settings
    pub export: ExportConfig,
    /// Default context variables for sink pathnames
    pub context: BTreeMap<String, String>,
    /// Output files
    #[serde(rename = "sink")]
    pub sinks: Vec<SinkConfig>,
    /// Column selectors, in header order
    #[serde(rename = "column")]
    pub columns: Vec<ColumnConfig>,
}

impl Config {
    /// Load from a file; `.json` files are read as JSON, anything else as TOML
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TreetabError::Io(e).with_context(format!("Failed to read {}", path.display()))
        })?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        };
        config.map_err(|e| e.with_context(format!("Invalid configuration {}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TreetabError::Toml(e.to_string()))
    }
}

/// Export-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Column length policy
    pub mode: TableMode,
    /// Line ending of delimited-text sinks
    pub line_terminator: LineTerminator,
    /// Create missing parent directories of sink files
    pub create_dirs: bool,
    /// Root child element whose children are context variables
    pub context_element: String,
    /// Extra extension to format mappings
    pub extensions: BTreeMap<String, Format>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: TableMode::Lenient,
            line_terminator: LineTerminator::Platform,
            create_dirs: true,
            context_element: "context".to_string(),
            extensions: BTreeMap::new(),
        }
    }
}

/// One output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Pathname template, e.g. `${out_dir}/table.csv`
    pub path: String,
}

impl SinkConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// One column, or a group of columns when `cells` is set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Path expression selecting the cells (or the group's column elements)
    pub select: String,
    /// Fixed label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Label taken from an attribute of the first match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_attribute: Option<String>,
    /// Label taken from a selector evaluated at the first match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_select: Option<String>,
    /// Cell selector relative to each matched element; makes this a group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cells: Option<String>,
}

impl ColumnConfig {
    pub fn new(select: impl Into<String>) -> Self {
        Self {
            select: select.into(),
            ..Self::default()
        }
    }

    /// Set a fixed label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Compile into a column source
    pub fn compile(&self) -> Result<ColumnSource> {
        let label = self.label_rule()?;
        match &self.cells {
            Some(cells) => Ok(ColumnGroup::new(&self.select, cells)?
                .with_label(label)?
                .into()),
            None => Ok(ColumnSelector::new(&self.select)?.with_label(label).into()),
        }
    }

    fn label_rule(&self) -> Result<LabelRule> {
        match (&self.label, &self.label_attribute, &self.label_select) {
            (None, None, None) => Ok(LabelRule::None),
            (Some(label), None, None) => Ok(LabelRule::Fixed(label.clone())),
            (None, Some(attr), None) => Ok(LabelRule::Attribute(attr.clone())),
            (None, None, Some(expr)) => Ok(LabelRule::Select(Selector::compile(expr)?)),
            _ => Err(TreetabError::Config(format!(
                "Column '{}' sets more than one of label, label_attribute, label_select",
                self.select
            ))),
        }
    }
}
