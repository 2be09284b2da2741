//! Fixed-width binary writer

use super::TableWriter;
use crate::error::{Result, TreetabError};
use crate::format::Format;
use crate::table::Row;
use std::io::Write;
use tracing::trace;

/// Low byte of an integer cell, `None` if the text is not an integer
///
/// `"300"` encodes as `0x2C` and `"-1"` as `0xFF`.
pub fn encode_cell(text: &str) -> Option<u8> {
    text.parse::<i64>().ok().map(|value| (value & 0xFF) as u8)
}

/// Writes one byte per cell, row-major, no header and no row padding
///
/// Absent cells are written as zero.
pub struct FixedWidthBinaryWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> FixedWidthBinaryWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: out,
            buf: Vec::new(),
        }
    }
}

impl<W: Write> TableWriter for FixedWidthBinaryWriter<W> {
    fn format(&self) -> Format {
        Format::FixedWidthBinary
    }

    fn write_header(&mut self, _labels: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, row: &Row<'_>) -> Result<()> {
        self.buf.clear();
        for (column, cell) in row.cells().enumerate() {
            let byte = match cell {
                None => 0,
                Some(text) => encode_cell(text).ok_or_else(|| TreetabError::InvalidCell {
                    column,
                    label: row.table().labels()[column].clone(),
                    row: row.index(),
                    value: text.to_string(),
                })?,
            };
            self.buf.push(byte);
        }
        self.inner.write_all(&self.buf)?;
        trace!(
            "Wrote {} bytes to row {} of binary file.",
            self.buf.len(),
            row.index()
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}
