//! Output formats and the extension registry

use crate::error::{Result, TreetabError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Table encoding of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// CSV with a header row of labels
    DelimitedText,
    /// One byte per cell, no header
    FixedWidthBinary,
}

impl Format {
    pub const ALL: [Format; 2] = [Format::DelimitedText, Format::FixedWidthBinary];

    /// Configuration name of the format
    pub fn name(&self) -> &'static str {
        match self {
            Format::DelimitedText => "delimited-text",
            Format::FixedWidthBinary => "fixed-width-binary",
        }
    }

    pub fn has_header(&self) -> bool {
        matches!(self, Format::DelimitedText)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = TreetabError;

    fn from_str(s: &str) -> Result<Self> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| TreetabError::Config(format!("Unknown format: {}", s)))
    }
}

/// Line ending used by delimited-text sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    Lf,
    Crlf,
    /// CRLF on Windows, LF elsewhere
    #[default]
    Platform,
}

impl LineTerminator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::Crlf => "\r\n",
            LineTerminator::Platform if cfg!(windows) => "\r\n",
            LineTerminator::Platform => "\n",
        }
    }

    pub(crate) fn to_csv(self) -> csv::Terminator {
        match self.as_str() {
            "\r\n" => csv::Terminator::CRLF,
            _ => csv::Terminator::Any(b'\n'),
        }
    }
}

/// Maps file extensions to formats
///
/// Matching is exact and case-sensitive: `table.CSV` is not a CSV sink.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    extensions: HashMap<String, Format>,
}

impl FormatRegistry {
    /// Create a registry with the default extensions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Register default extensions
        registry.register("csv", Format::DelimitedText);
        registry.register("bin", Format::FixedWidthBinary);
        registry.register("raw", Format::FixedWidthBinary);

        registry
    }

    /// Create a registry that knows no extensions
    pub fn empty() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    /// Register an extension, replacing any previous mapping
    pub fn register(&mut self, extension: impl Into<String>, format: Format) {
        self.extensions.insert(extension.into(), format);
    }

    pub fn get(&self, extension: &str) -> Option<Format> {
        self.extensions.get(extension).copied()
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.extensions.contains_key(extension)
    }

    /// Format of a path, from its extension
    pub fn resolve(&self, path: &Path) -> Result<Format> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        self.get(extension)
            .ok_or_else(|| TreetabError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: extension.to_string(),
            })
    }

    /// Registered extensions, sorted
    pub fn available_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<_> = self.extensions.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
