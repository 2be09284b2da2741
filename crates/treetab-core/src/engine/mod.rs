//! Export engine
//!
//! An [`ExportEngine`] pairs an immutable [`ExportPlan`] with a [`SinkOpener`]
//! and runs one pass per document. Each pass walks the states in
//! [`ExportState`]: every sink is resolved before any is opened, the table is
//! assembled once, each format's writer encodes rows once and fans the bytes
//! out to all sinks of that format, and every opened sink is closed exactly
//! once whatever happened before.

mod fanout;
mod plan;
mod report;
mod state;

pub use plan::{ExportPlan, ExportPlanBuilder};
pub use report::{ExportPreview, ExportReport, SinkSummary};
pub use state::ExportState;

use crate::document::Document;
use crate::error::{Result, TreetabError};
use crate::format::Format;
use crate::sink::SinkOpener;
use crate::table::Table;
use crate::writer::writer_for;
use fanout::{FanOut, OpenSink};
use tracing::{debug, info, warn};

/// Runs export passes
pub struct ExportEngine<O: SinkOpener> {
    plan: ExportPlan,
    opener: O,
}

impl<O: SinkOpener> ExportEngine<O> {
    pub fn new(plan: ExportPlan, opener: O) -> Self {
        Self { plan, opener }
    }

    pub fn plan(&self) -> &ExportPlan {
        &self.plan
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Start a pass; call [`ExportPass::execute`] to run it
    pub fn pass(&self) -> ExportPass<'_, O> {
        ExportPass::new(&self.plan, &self.opener)
    }

    /// Run one complete pass over `doc`
    pub fn run(&self, doc: &Document) -> Result<ExportReport> {
        self.pass().execute(doc)
    }

    /// Resolve sinks and assemble the table without opening anything
    pub fn preview(&self, doc: &Document) -> Result<ExportPreview> {
        self.plan.preview(doc)
    }
}

/// One execution of a plan over one document
pub struct ExportPass<'a, O: SinkOpener> {
    plan: &'a ExportPlan,
    opener: &'a O,
    state: ExportState,
    history: Vec<ExportState>,
}

impl<'a, O: SinkOpener> ExportPass<'a, O> {
    fn new(plan: &'a ExportPlan, opener: &'a O) -> Self {
        Self {
            plan,
            opener,
            state: ExportState::Configuring,
            history: vec![ExportState::Configuring],
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[ExportState] {
        &self.history
    }

    /// Run the pass to `Done` or `Failed`
    pub fn execute(&mut self, doc: &Document) -> Result<ExportReport> {
        if self.state != ExportState::Configuring {
            return Err(TreetabError::Config(format!(
                "Export pass already {}",
                self.state
            )));
        }

        let mut sinks = Vec::new();
        let outcome = self.drive(doc, &mut sinks);

        self.transition(ExportState::Closing);
        let close_error = close_all(&mut sinks);

        match (outcome, close_error) {
            (Ok(table), None) => {
                self.transition(ExportState::Done);
                let report = ExportReport {
                    rows: table.row_count(),
                    columns: table.column_count(),
                    labels: table.labels().to_vec(),
                    sinks: sinks
                        .iter()
                        .map(|sink| SinkSummary {
                            path: sink.descriptor.path().to_path_buf(),
                            format: sink.descriptor.format(),
                            bytes: sink.bytes,
                        })
                        .collect(),
                };
                info!(
                    "Exported {} rows x {} columns to {} sink(s)",
                    report.rows,
                    report.columns,
                    report.sinks.len()
                );
                Ok(report)
            }
            (Ok(_), Some(err)) => {
                self.transition(ExportState::Failed);
                Err(err)
            }
            (Err(err), close_error) => {
                if let Some(close_error) = close_error {
                    warn!("Close failure after earlier error: {}", close_error);
                }
                self.transition(ExportState::Failed);
                Err(err)
            }
        }
    }

    fn drive(&mut self, doc: &Document, sinks: &mut Vec<OpenSink>) -> Result<Table> {
        let context = self.plan.context_for(doc);

        self.transition(ExportState::SinksOpening);
        let descriptors = self.plan.resolve_sinks(&context)?;
        for descriptor in descriptors {
            info!(
                "Opening file '{}' for {} export.",
                descriptor.path().display(),
                descriptor.format()
            );
            let handle = self.opener.open(&descriptor)?;
            sinks.push(OpenSink::new(descriptor, handle));
        }

        self.transition(ExportState::Evaluating);
        let table = self.plan.assemble(doc)?;

        self.transition(ExportState::Writing);
        for format in Format::ALL {
            self.write_format(format, &table, sinks)?;
        }

        Ok(table)
    }

    fn write_format(&self, format: Format, table: &Table, sinks: &mut [OpenSink]) -> Result<()> {
        let targets: Vec<&mut OpenSink> = sinks
            .iter_mut()
            .filter(|sink| sink.descriptor.format() == format)
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        let count = targets.len();

        let mut writer = writer_for(format, FanOut::new(targets), self.plan.writer_options());
        if format.has_header() {
            writer.write_header(table.labels())?;
        }
        for row in table.rows() {
            writer.write_row(&row)?;
        }
        writer.finish()?;

        debug!(
            "Wrote {} rows to {} {} sink(s)",
            table.row_count(),
            count,
            format
        );
        Ok(())
    }

    fn transition(&mut self, next: ExportState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        debug!("Export pass: {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

/// Close every sink once, returning the first failure
fn close_all(sinks: &mut [OpenSink]) -> Option<TreetabError> {
    let mut first = None;
    for sink in sinks.iter_mut() {
        if let Err(err) = sink.close() {
            if first.is_none() {
                first = Some(err);
            } else {
                warn!("{}", err);
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnGroup, ColumnSelector, LabelRule};
    use crate::context::RuntimeContext;
    use crate::document::parse_str;
    use crate::error::ErrorKind;
    use crate::format::LineTerminator;
    use crate::sink::MemorySinks;
    use crate::table::TableMode;
    use pretty_assertions::assert_eq;

    const SAMPLES: &str = r#"
<log>
  <context><run>7</run></context>
  <sample><a>1</a><b>7</b></sample>
  <sample><a>2</a></sample>
  <sample><a>3</a></sample>
</log>"#;

    fn builder() -> ExportPlanBuilder {
        ExportPlan::builder(RuntimeContext::new("/out")).line_terminator(LineTerminator::Lf)
    }

    fn labeled(expr: &str, label: &str) -> ColumnSelector {
        ColumnSelector::new(expr)
            .unwrap()
            .with_label(LabelRule::Fixed(label.to_string()))
    }

    fn engine(plan: ExportPlan, sinks: &MemorySinks) -> ExportEngine<MemorySinks> {
        ExportEngine::new(plan, sinks.clone())
    }

    #[test]
    fn test_fan_out_writes_identical_bytes() {
        let plan = builder()
            .sink("a.csv")
            .sink("b.csv")
            .sink("c.bin")
            .sink("d.raw")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        let report = engine(plan, &sinks).run(&doc).unwrap();

        assert_eq!(sinks.text("/out/a.csv").unwrap(), "A\n1\n2\n3\n");
        assert_eq!(sinks.contents("/out/a.csv"), sinks.contents("/out/b.csv"));
        assert_eq!(sinks.contents("/out/c.bin").unwrap(), vec![1, 2, 3]);
        assert_eq!(sinks.contents("/out/c.bin"), sinks.contents("/out/d.raw"));

        assert_eq!(report.rows, 3);
        assert_eq!(report.sinks.len(), 4);
        assert_eq!(report.sinks[0].bytes, 8);
        assert_eq!(report.sinks[2].bytes, 3);
        assert_eq!(report.total_bytes(), 22);
        assert_eq!(sinks.open_handles(), 0);
    }

    #[test]
    fn test_lenient_pads_short_columns() {
        let plan = builder()
            .sink("t.csv")
            .sink("t.bin")
            .column(labeled("//a", "A"))
            .column(ColumnSelector::new("//b").unwrap())
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        let report = engine(plan, &sinks).run(&doc).unwrap();

        assert_eq!(sinks.text("/out/t.csv").unwrap(), "A,Field1\n1,7\n2,\n3,\n");
        assert_eq!(sinks.contents("/out/t.bin").unwrap(), vec![1, 7, 2, 0, 3, 0]);
        assert_eq!(report.labels, vec!["A", "Field1"]);
    }

    #[test]
    fn test_binary_keeps_low_byte() {
        let plan = builder()
            .sink("t.bin")
            .column(ColumnSelector::new("//v").unwrap())
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str("<r><v>300</v><v>-1</v><v>255</v></r>").unwrap();

        engine(plan, &sinks).run(&doc).unwrap();
        assert_eq!(sinks.contents("/out/t.bin").unwrap(), vec![0x2C, 0xFF, 0xFF]);
    }

    #[test]
    fn test_unrecognized_extension_opens_nothing() {
        let plan = builder()
            .sink("a.csv")
            .sink("b.xyz")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();
        let engine = engine(plan, &sinks);

        let mut pass = engine.pass();
        let err = pass.execute(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("xyz"));
        assert_eq!(sinks.opened(), 0);
        assert!(sinks.contents("/out/a.csv").is_none());
        assert_eq!(
            pass.history(),
            &[
                ExportState::Configuring,
                ExportState::SinksOpening,
                ExportState::Closing,
                ExportState::Failed,
            ]
        );
    }

    #[test]
    fn test_strict_mismatch_writes_nothing() {
        let plan = builder()
            .mode(TableMode::Strict)
            .sink("t.csv")
            .sink("t.bin")
            .column(labeled("//x", "X"))
            .column(labeled("//y", "Y"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(
            "<r><x>1</x><x>2</x><x>3</x><x>4</x><y>1</y><y>2</y><y>3</y><y>4</y><y>5</y></r>",
        )
        .unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("'X'"));
        assert_eq!(sinks.contents("/out/t.csv").unwrap(), Vec::<u8>::new());
        assert_eq!(sinks.contents("/out/t.bin").unwrap(), Vec::<u8>::new());
        assert_eq!(sinks.closed(), 2);
        assert_eq!(sinks.open_handles(), 0);
    }

    #[test]
    fn test_strict_columnar_group() {
        let plan = builder()
            .mode(TableMode::Strict)
            .sink("t.csv")
            .column(
                ColumnGroup::new("//column", "*")
                    .unwrap()
                    .with_label(LabelRule::Attribute("label".to_string()))
                    .unwrap(),
            )
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(
            r#"<data>
                 <column label="t"><c>0</c><c>1</c></column>
                 <column label="v"><c>5</c><c>6</c></column>
               </data>"#,
        )
        .unwrap();

        engine(plan, &sinks).run(&doc).unwrap();
        assert_eq!(sinks.text("/out/t.csv").unwrap(), "t,v\n0,5\n1,6\n");
    }

    #[test]
    fn test_open_failure_closes_opened_sinks() {
        let plan = builder()
            .sink("a.csv")
            .sink("b.csv")
            .sink("c.csv")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        sinks.fail_on_open("/out/b.csv");
        let doc = parse_str(SAMPLES).unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("b.csv"));
        assert_eq!(sinks.opened(), 1);
        assert_eq!(sinks.closed(), 1);
        assert!(sinks.contents("/out/c.csv").is_none());
    }

    #[test]
    fn test_write_failure_closes_every_sink() {
        let plan = builder()
            .sink("a.csv")
            .sink("b.csv")
            .sink("c.bin")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        sinks.fail_on_write("/out/b.csv");
        let doc = parse_str(SAMPLES).unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("b.csv"));
        assert_eq!(sinks.opened(), 3);
        assert_eq!(sinks.closed(), 3);
        assert_eq!(sinks.open_handles(), 0);
        assert_eq!(sinks.text("/out/a.csv").unwrap(), "A\n1\n2\n3\n");
        assert_eq!(sinks.contents("/out/c.bin").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_close_failure_fails_pass() {
        let plan = builder()
            .sink("a.csv")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        sinks.fail_on_close("/out/a.csv");
        let doc = parse_str(SAMPLES).unwrap();

        let engine = engine(plan, &sinks);
        let mut pass = engine.pass();
        let err = pass.execute(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(pass.state(), ExportState::Failed);
        assert_eq!(sinks.text("/out/a.csv").unwrap(), "A\n1\n2\n3\n");
    }

    #[test]
    fn test_close_failure_does_not_mask_earlier_error() {
        let plan = builder()
            .sink("a.csv")
            .column(ColumnSelector::new("//missing").unwrap())
            .mode(TableMode::Strict)
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        sinks.fail_on_close("/out/a.csv");
        let doc = parse_str(SAMPLES).unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(sinks.closed(), 1);
    }

    #[test]
    fn test_invalid_binary_cell() {
        let plan = builder()
            .sink("t.csv")
            .sink("t.bin")
            .column(labeled("//v", "Volts"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str("<r><v>1</v><v>abc</v></r>").unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("Volts"));
        assert_eq!(sinks.text("/out/t.csv").unwrap(), "Volts\n1\nabc\n");
        assert_eq!(sinks.open_handles(), 0);
    }

    #[test]
    fn test_pass_is_idempotent() {
        let plan = builder()
            .sink("t.csv")
            .sink("t.bin")
            .column(labeled("//a", "A"))
            .column(ColumnSelector::new("//b").unwrap())
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();
        let engine = engine(plan, &sinks);

        engine.run(&doc).unwrap();
        let first = (sinks.contents("/out/t.csv"), sinks.contents("/out/t.bin"));
        engine.run(&doc).unwrap();
        let second = (sinks.contents("/out/t.csv"), sinks.contents("/out/t.bin"));

        assert_eq!(first, second);
    }

    #[test]
    fn test_header_round_trips_labels() {
        let plan = builder()
            .sink("t.csv")
            .column(labeled("//a", "a,b"))
            .column(labeled("//b", "say \"hi\""))
            .column(labeled("//a", "line\nbreak"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        let report = engine(plan, &sinks).run(&doc).unwrap();

        let bytes = sinks.contents("/out/t.csv").unwrap();
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, report.labels);
    }

    #[test]
    fn test_document_context_names_sinks() {
        let plan = builder()
            .sink("run-${run}.csv")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        engine(plan, &sinks).run(&doc).unwrap();
        assert_eq!(sinks.paths(), vec![std::path::PathBuf::from("/out/run-7.csv")]);
    }

    #[test]
    fn test_no_columns_is_structural() {
        let plan = builder().sink("t.csv").build().unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        let err = engine(plan, &sinks).run(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(sinks.open_handles(), 0);
    }

    #[test]
    fn test_happy_path_history() {
        let plan = builder()
            .sink("t.csv")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();
        let engine = engine(plan, &sinks);

        let mut pass = engine.pass();
        pass.execute(&doc).unwrap();
        assert_eq!(
            pass.history(),
            &[
                ExportState::Configuring,
                ExportState::SinksOpening,
                ExportState::Evaluating,
                ExportState::Writing,
                ExportState::Closing,
                ExportState::Done,
            ]
        );

        let err = pass.execute(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_preview_touches_no_sinks() {
        let plan = builder()
            .sink("t.csv")
            .sink("t.bin")
            .column(labeled("//a", "A"))
            .build()
            .unwrap();
        let sinks = MemorySinks::new();
        let doc = parse_str(SAMPLES).unwrap();

        let preview = engine(plan, &sinks).preview(&doc).unwrap();

        assert_eq!(preview.sinks.len(), 2);
        assert_eq!(preview.sinks[1].format(), Format::FixedWidthBinary);
        assert_eq!(preview.table.row_count(), 3);
        assert_eq!(sinks.opened(), 0);
    }
}
