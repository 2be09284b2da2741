//! Immutable export plans

use crate::column::ColumnSource;
use crate::config::Config;
use crate::context::{self, RuntimeContext};
use crate::document::Document;
use crate::engine::ExportPreview;
use crate::error::{Result, TreetabError};
use crate::format::{Format, FormatRegistry, LineTerminator};
use crate::sink::SinkDescriptor;
use crate::table::{Table, TableBuilder, TableMode};
use crate::writer::WriterOptions;
use tracing::{debug, warn};

/// Everything a pass needs, validated up front
///
/// Selectors are compiled and pathname templates syntax-checked when the plan
/// is built, so configuration mistakes surface before any file is touched.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    sinks: Vec<String>,
    columns: Vec<ColumnSource>,
    mode: TableMode,
    line_terminator: LineTerminator,
    registry: FormatRegistry,
    context: RuntimeContext,
    context_element: String,
}

impl ExportPlan {
    pub fn builder(context: RuntimeContext) -> ExportPlanBuilder {
        ExportPlanBuilder::new(context)
    }

    /// Build a plan from configuration
    pub fn from_config(config: &Config, mut context: RuntimeContext) -> Result<Self> {
        for (name, value) in &config.context {
            context.set(name.clone(), value.clone());
        }

        let mut builder = ExportPlanBuilder::new(context)
            .mode(config.export.mode)
            .line_terminator(config.export.line_terminator)
            .context_element(config.export.context_element.clone());

        for (extension, format) in &config.export.extensions {
            builder = builder.extension(extension.clone(), *format);
        }
        for sink in &config.sinks {
            builder = builder.sink(sink.path.clone());
        }
        for (index, column) in config.columns.iter().enumerate() {
            let source = column
                .compile()
                .map_err(|e| e.with_context(format!("Column {}", index)))?;
            builder = builder.column(source);
        }

        builder.build()
    }

    pub fn sink_templates(&self) -> &[String] {
        &self.sinks
    }

    pub fn columns(&self) -> &[ColumnSource] {
        &self.columns
    }

    pub fn mode(&self) -> TableMode {
        self.mode
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            line_terminator: self.line_terminator,
        }
    }

    /// Runtime context with the document's context element merged in
    pub fn context_for(&self, doc: &Document) -> RuntimeContext {
        let mut context = self.context.clone();
        context.merge_document(doc, &self.context_element);
        context
    }

    /// Resolve every sink without opening any
    pub fn resolve_sinks(&self, context: &RuntimeContext) -> Result<Vec<SinkDescriptor>> {
        self.sinks
            .iter()
            .map(|template| SinkDescriptor::resolve(template, context, &self.registry))
            .collect()
    }

    /// Evaluate every column source and assemble the table
    pub fn assemble(&self, doc: &Document) -> Result<Table> {
        let mut builder = TableBuilder::new(self.mode);
        for source in &self.columns {
            let columns = source.evaluate(doc);
            if columns.is_empty() {
                debug!("Column group '{}' matched no elements", source.expr());
            }
            builder.extend(columns);
        }
        builder.build()
    }

    /// Resolve sinks and assemble the table without opening anything
    pub fn preview(&self, doc: &Document) -> Result<ExportPreview> {
        let sinks = self.resolve_sinks(&self.context_for(doc))?;
        let table = self.assemble(doc)?;
        Ok(ExportPreview { sinks, table })
    }
}

/// Collects plan settings, then validates them in [`ExportPlanBuilder::build`]
pub struct ExportPlanBuilder {
    sinks: Vec<String>,
    columns: Vec<ColumnSource>,
    mode: TableMode,
    line_terminator: LineTerminator,
    registry: FormatRegistry,
    context: RuntimeContext,
    context_element: String,
}

impl ExportPlanBuilder {
    pub fn new(context: RuntimeContext) -> Self {
        Self {
            sinks: Vec::new(),
            columns: Vec::new(),
            mode: TableMode::default(),
            line_terminator: LineTerminator::default(),
            registry: FormatRegistry::new(),
            context,
            context_element: "context".to_string(),
        }
    }

    /// Add a sink pathname template
    pub fn sink(mut self, template: impl Into<String>) -> Self {
        self.sinks.push(template.into());
        self
    }

    /// Add a column source
    pub fn column(mut self, source: impl Into<ColumnSource>) -> Self {
        self.columns.push(source.into());
        self
    }

    pub fn mode(mut self, mode: TableMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn line_terminator(mut self, line_terminator: LineTerminator) -> Self {
        self.line_terminator = line_terminator;
        self
    }

    pub fn context_element(mut self, element: impl Into<String>) -> Self {
        self.context_element = element.into();
        self
    }

    /// Map an extra extension to a format
    pub fn extension(mut self, extension: impl Into<String>, format: Format) -> Self {
        self.registry.register(extension, format);
        self
    }

    pub fn build(self) -> Result<ExportPlan> {
        for template in &self.sinks {
            context::check_template(template)?;
        }
        if self.context_element.trim().is_empty() {
            return Err(TreetabError::Config(
                "context_element must not be empty".to_string(),
            ));
        }
        if self.sinks.is_empty() {
            warn!("No sinks configured; the export will write nothing");
        }

        Ok(ExportPlan {
            sinks: self.sinks,
            columns: self.columns,
            mode: self.mode,
            line_terminator: self.line_terminator,
            registry: self.registry,
            context: self.context,
            context_element: self.context_element,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSelector;
    use crate::config::{ColumnConfig, SinkConfig};
    use crate::document::parse_str;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.context.insert("out".to_string(), "data".to_string());
        config.sinks.push(SinkConfig::new("${out}/t.csv"));
        config.columns.push(ColumnConfig::new("//v").label("V"));

        let plan = ExportPlan::from_config(&config, RuntimeContext::new("/w")).unwrap();
        assert_eq!(plan.sink_templates(), &["${out}/t.csv"]);
        assert_eq!(plan.columns().len(), 1);

        let doc = parse_str("<log><v>1</v></log>").unwrap();
        let sinks = plan.resolve_sinks(&plan.context_for(&doc)).unwrap();
        assert_eq!(sinks[0].path(), std::path::Path::new("/w/data/t.csv"));
    }

    #[test]
    fn test_bad_selector_names_column() {
        let mut config = Config::default();
        config.columns.push(ColumnConfig::new("//v"));
        config.columns.push(ColumnConfig::new("//v["));
        let err = ExportPlan::from_config(&config, RuntimeContext::new("/w")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().starts_with("Column 1"));
    }

    #[test]
    fn test_bad_template_rejected_at_build() {
        let err = ExportPlan::builder(RuntimeContext::new("/w"))
            .sink("${out/t.csv")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_document_context_drives_paths() {
        let plan = ExportPlan::builder(RuntimeContext::new("/w").with_var("run", "default"))
            .sink("run-${run}.csv")
            .column(ColumnSelector::new("//v").unwrap())
            .build()
            .unwrap();

        let doc = parse_str("<log><context><run>42</run></context><v>1</v></log>").unwrap();
        let sinks = plan.resolve_sinks(&plan.context_for(&doc)).unwrap();
        assert_eq!(sinks[0].path(), std::path::Path::new("/w/run-42.csv"));
    }

    #[test]
    fn test_assemble_keeps_declaration_order() {
        let plan = ExportPlan::builder(RuntimeContext::new("/w"))
            .column(ColumnSelector::new("//b").unwrap())
            .column(ColumnSelector::new("//a").unwrap())
            .build()
            .unwrap();
        let doc = parse_str("<r><a>1</a><b>2</b><b>3</b></r>").unwrap();
        let table = plan.assemble(&doc).unwrap();
        assert_eq!(table.labels(), &["Field0", "Field1"]);
        assert_eq!(table.cell(0, 0), Some("2"));
        assert_eq!(table.cell(0, 1), Some("1"));
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_preview_resolves_then_assembles() {
        let plan = ExportPlan::builder(RuntimeContext::new("/w"))
            .sink("run-${run}.csv")
            .sink("run-${run}.bin")
            .column(ColumnSelector::new("//v").unwrap())
            .build()
            .unwrap();
        let doc = parse_str("<log><context><run>9</run></context><v>1</v><v>2</v></log>").unwrap();

        let preview = plan.preview(&doc).unwrap();
        assert_eq!(preview.sinks[0].path(), std::path::Path::new("/w/run-9.csv"));
        assert_eq!(preview.sinks[1].format(), Format::FixedWidthBinary);
        assert_eq!(preview.table.row_count(), 2);

        let plan = ExportPlan::builder(RuntimeContext::new("/w"))
            .sink("t.xyz")
            .column(ColumnSelector::new("//v").unwrap())
            .build()
            .unwrap();
        assert_eq!(plan.preview(&doc).unwrap_err().kind(), ErrorKind::Configuration);
    }
}
