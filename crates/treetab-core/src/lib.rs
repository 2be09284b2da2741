//! treetab-core - Core library for treetab
//!
//! This crate turns selected sub-trees of an XML document into tables and
//! writes them to delimited-text and fixed-width binary files. It provides the
//! document model, path selectors, the table assembler, format writers and the
//! export engine; file-system sinks live in `treetab-storage`.

pub mod column;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod format;
pub mod selector;
pub mod sink;
pub mod table;
pub mod writer;

pub use column::{ColumnGroup, ColumnSelector, ColumnSource, LabelRule};
pub use config::{ColumnConfig, Config, ExportConfig, SinkConfig};
pub use context::RuntimeContext;
pub use document::{parse_file, parse_str, Document};
pub use engine::{
    ExportEngine, ExportPass, ExportPlan, ExportPlanBuilder, ExportPreview, ExportReport,
    ExportState, SinkSummary,
};
pub use error::{ErrorKind, Result, TreetabError};
pub use format::{Format, FormatRegistry, LineTerminator};
pub use selector::Selector;
pub use sink::{MemorySinks, SinkDescriptor, SinkHandle, SinkOpener};
pub use table::{Column, Table, TableBuilder, TableMode};
