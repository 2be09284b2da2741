//! Error types for treetab

use std::path::PathBuf;
use thiserror::Error;

/// Broad class of a failure, used by callers to decide how to report it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad configuration, selector, pathname, format or input document
    Configuration,
    /// The selected columns cannot form a table
    Structural,
    /// File open, write, flush or close failure
    Io,
    /// A cell value that cannot be encoded
    Data,
}

/// Main error type for treetab
#[derive(Debug, Error)]
pub enum TreetabError {
    /// IO error not tied to a particular sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reading, writing or closing a sink
    #[error("Sink '{}': {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input document could not be parsed
    #[error("Malformed document: {0}")]
    Document(String),

    /// Selector expression failed to compile
    #[error("Invalid selector '{expr}': {message}")]
    InvalidSelector { expr: String, message: String },

    /// Sink pathname template could not be resolved
    #[error("Cannot resolve pathname '{template}': {message}")]
    Pathname { template: String, message: String },

    /// Sink file extension has no registered format
    #[error("Unrecognized table format '{extension}' for {}", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Nothing to export
    #[error("No columns selected")]
    NoColumns,

    /// Strict mode: columns differ in length
    #[error("Column {index} ('{label}') has {len} rows, expected {expected}")]
    ColumnLengthMismatch {
        index: usize,
        label: String,
        len: usize,
        expected: usize,
    },

    /// Strict mode: column has no label
    #[error("Column {index} has no label")]
    MissingLabel { index: usize },

    /// Binary export of a non-integer cell
    #[error("Column {column} ('{label}') row {row}: '{value}' is not an integer")]
    InvalidCell {
        column: usize,
        label: String,
        row: usize,
        value: String,
    },

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TreetabError>,
    },
}

impl TreetabError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TreetabError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap an IO error with the sink it happened on
    pub fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TreetabError::Sink {
            path: path.into(),
            source,
        }
    }

    /// Taxonomy class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TreetabError::Io(_) | TreetabError::Sink { .. } => ErrorKind::Io,
            TreetabError::Json(_)
            | TreetabError::Toml(_)
            | TreetabError::Config(_)
            | TreetabError::Document(_)
            | TreetabError::InvalidSelector { .. }
            | TreetabError::Pathname { .. }
            | TreetabError::UnsupportedFormat { .. } => ErrorKind::Configuration,
            TreetabError::NoColumns
            | TreetabError::ColumnLengthMismatch { .. }
            | TreetabError::MissingLabel { .. } => ErrorKind::Structural,
            TreetabError::InvalidCell { .. } => ErrorKind::Data,
            TreetabError::WithContext { source, .. } => source.kind(),
        }
    }
}

impl From<toml::de::Error> for TreetabError {
    fn from(err: toml::de::Error) -> Self {
        TreetabError::Toml(err.to_string())
    }
}

impl From<csv::Error> for TreetabError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(io) => TreetabError::Io(io),
            other => TreetabError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("CSV error: {:?}", other),
            )),
        }
    }
}

/// Result type alias for treetab
pub type Result<T> = std::result::Result<T, TreetabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TreetabError::UnsupportedFormat {
            path: PathBuf::from("out/table.xyz"),
            extension: "xyz".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unrecognized table format 'xyz' for out/table.xyz"
        );
    }

    #[test]
    fn test_error_with_context_keeps_kind() {
        let err = TreetabError::NoColumns.with_context("Export failed");
        assert!(err.to_string().contains("Export failed"));
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TreetabError = io_err.into();
        assert!(matches!(err, TreetabError::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_kinds() {
        let cell = TreetabError::InvalidCell {
            column: 1,
            label: "Volts".to_string(),
            row: 3,
            value: "abc".to_string(),
        };
        assert_eq!(cell.kind(), ErrorKind::Data);
        assert!(cell.to_string().contains("'abc' is not an integer"));

        let sel = TreetabError::InvalidSelector {
            expr: "//[".to_string(),
            message: "empty step".to_string(),
        };
        assert_eq!(sel.kind(), ErrorKind::Configuration);
    }
}
