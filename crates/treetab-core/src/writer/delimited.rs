//! Delimited-text (CSV) writer

use super::TableWriter;
use crate::error::Result;
use crate::format::{Format, LineTerminator};
use crate::table::Row;
use std::io::Write;
use tracing::trace;

/// Writes a header of labels, then one record per row
///
/// Quoting follows RFC 4180: fields containing a comma, a quote or a line
/// break are quoted and embedded quotes doubled. Absent cells are empty
/// fields.
pub struct DelimitedTextWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> DelimitedTextWriter<W> {
    pub fn new(out: W, terminator: LineTerminator) -> Self {
        let inner = csv::WriterBuilder::new()
            .terminator(terminator.to_csv())
            .from_writer(out);
        Self { inner }
    }
}

impl<W: Write> TableWriter for DelimitedTextWriter<W> {
    fn format(&self) -> Format {
        Format::DelimitedText
    }

    fn write_header(&mut self, labels: &[String]) -> Result<()> {
        self.inner.write_record(labels)?;
        trace!("Wrote CSV header: {} fields", labels.len());
        Ok(())
    }

    fn write_row(&mut self, row: &Row<'_>) -> Result<()> {
        self.inner
            .write_record(row.cells().map(|cell| cell.unwrap_or("")))?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, Table, TableBuilder, TableMode};
    use pretty_assertions::assert_eq;

    fn render(table: &Table, terminator: LineTerminator) -> String {
        let mut out = Vec::new();
        {
            let mut writer = DelimitedTextWriter::new(&mut out, terminator);
            writer.write_header(table.labels()).unwrap();
            for row in table.rows() {
                writer.write_row(&row).unwrap();
            }
            writer.finish().unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_header_and_padding() {
        let table = TableBuilder::new(TableMode::Lenient)
            .column(Column::labeled("a", strings(&["1", "2", "3"])))
            .column(Column::new(None, strings(&["x"])))
            .build()
            .unwrap();

        assert_eq!(
            render(&table, LineTerminator::Lf),
            "a,Field1\n1,x\n2,\n3,\n"
        );
    }

    #[test]
    fn test_quoting() {
        let table = TableBuilder::new(TableMode::Lenient)
            .column(Column::labeled("say, \"hi\"", strings(&["a,b", "line\nbreak", "q\"q"])))
            .column(Column::labeled("plain", strings(&["1", "2", "3"])))
            .build()
            .unwrap();

        assert_eq!(
            render(&table, LineTerminator::Lf),
            "\"say, \"\"hi\"\"\",plain\n\"a,b\",1\n\"line\nbreak\",2\n\"q\"\"q\",3\n"
        );
    }

    #[test]
    fn test_crlf() {
        let table = TableBuilder::new(TableMode::Lenient)
            .column(Column::labeled("a", strings(&["1"])))
            .column(Column::labeled("b", strings(&["2"])))
            .build()
            .unwrap();
        assert_eq!(render(&table, LineTerminator::Crlf), "a,b\r\n1,2\r\n");
    }
}
