//! Table writers
//!
//! One writer strategy per [`Format`]. A writer encodes each row once into an
//! underlying [`Write`]; the export engine points that at every sink of the
//! format at the same time, so all of them receive identical bytes.

mod binary;
mod delimited;

pub use binary::{encode_cell, FixedWidthBinaryWriter};
pub use delimited::DelimitedTextWriter;

use crate::error::Result;
use crate::format::{Format, LineTerminator};
use crate::table::Row;
use std::io::Write;

/// Writer strategy for one format
pub trait TableWriter {
    /// Format this writer produces
    fn format(&self) -> Format;

    /// Write the header, once, before any row
    fn write_header(&mut self, labels: &[String]) -> Result<()>;

    /// Write one row
    fn write_row(&mut self, row: &Row<'_>) -> Result<()>;

    /// Flush everything buffered by the writer
    fn finish(&mut self) -> Result<()>;
}

/// Options shared by all writers of a pass
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterOptions {
    pub line_terminator: LineTerminator,
}

/// Create the writer for a format over `out`
pub fn writer_for<'a, W: Write + 'a>(
    format: Format,
    out: W,
    options: WriterOptions,
) -> Box<dyn TableWriter + 'a> {
    match format {
        Format::DelimitedText => Box::new(DelimitedTextWriter::new(out, options.line_terminator)),
        Format::FixedWidthBinary => Box::new(FixedWidthBinaryWriter::new(out)),
    }
}
