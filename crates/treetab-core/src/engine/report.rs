//! Pass results

use crate::format::Format;
use crate::sink::SinkDescriptor;
use crate::table::Table;
use serde::Serialize;
use std::path::PathBuf;

/// What one sink received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkSummary {
    pub path: PathBuf,
    pub format: Format,
    pub bytes: u64,
}

/// Outcome of a successful pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub rows: usize,
    pub columns: usize,
    pub labels: Vec<String>,
    pub sinks: Vec<SinkSummary>,
}

impl ExportReport {
    /// Total bytes written across all sinks
    pub fn total_bytes(&self) -> u64 {
        self.sinks.iter().map(|s| s.bytes).sum()
    }
}

/// Resolved sinks and assembled table, without any output written
#[derive(Debug, Clone)]
pub struct ExportPreview {
    pub sinks: Vec<SinkDescriptor>,
    pub table: Table,
}
