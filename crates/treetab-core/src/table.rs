//! Table assembly
//!
//! Columns are evaluated independently and may differ in length. The
//! assembler turns them into a rectangular row stream: in lenient mode the
//! table is as long as its longest column and shorter columns read as absent
//! past their end; in strict mode every column must have the same length and
//! a label.

use crate::error::{Result, TreetabError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Column length policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMode {
    /// Pad short columns with absent cells
    #[default]
    Lenient,
    /// Require equal lengths and a label on every column
    Strict,
}

/// Header used for a column without a label
pub fn default_label(index: usize) -> String {
    format!("Field{}", index)
}

/// One evaluated column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    label: Option<String>,
    cells: Vec<String>,
}

impl Column {
    pub fn new(label: Option<String>, cells: Vec<String>) -> Self {
        Self { label, cells }
    }

    /// Column with a label
    pub fn labeled(label: impl Into<String>, cells: Vec<String>) -> Self {
        Self::new(Some(label.into()), cells)
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&str> {
        self.cells.get(row).map(String::as_str)
    }
}

/// Collects columns and validates them into a [`Table`]
#[derive(Debug, Default)]
pub struct TableBuilder {
    mode: TableMode,
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new(mode: TableMode) -> Self {
        Self {
            mode,
            columns: Vec::new(),
        }
    }

    /// Append a column
    pub fn push(&mut self, column: Column) -> &mut Self {
        self.columns.push(column);
        self
    }

    /// Builder form of [`TableBuilder::push`]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn extend(&mut self, columns: impl IntoIterator<Item = Column>) -> &mut Self {
        self.columns.extend(columns);
        self
    }

    /// Validate the columns and freeze the table
    pub fn build(self) -> Result<Table> {
        if self.columns.is_empty() {
            return Err(TreetabError::NoColumns);
        }

        let row_count = self.columns.iter().map(Column::len).max().unwrap_or(0);

        if self.mode == TableMode::Strict {
            for (index, column) in self.columns.iter().enumerate() {
                if column.label.is_none() {
                    return Err(TreetabError::MissingLabel { index });
                }
            }
            if let Some((index, column)) = self
                .columns
                .iter()
                .enumerate()
                .find(|(_, column)| column.len() != row_count)
            {
                return Err(TreetabError::ColumnLengthMismatch {
                    index,
                    label: column.label().unwrap_or_default().to_string(),
                    len: column.len(),
                    expected: row_count,
                });
            }
        }

        let labels: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                column
                    .label
                    .clone()
                    .unwrap_or_else(|| default_label(index))
            })
            .collect();

        for (label, column) in labels.iter().zip(&self.columns) {
            debug!("{} column has {} rows.", label, column.len());
        }
        let padded: Vec<&str> = labels
            .iter()
            .zip(&self.columns)
            .filter(|(_, column)| column.len() < row_count)
            .map(|(label, _)| label.as_str())
            .collect();
        if !padded.is_empty() {
            debug!(
                "Padding {} short column(s) to {} rows: {}",
                padded.len(),
                row_count,
                padded.join(", ")
            );
        }

        Ok(Table {
            columns: self.columns,
            labels,
            row_count,
        })
    }
}

/// Rectangular view over a fixed set of columns
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    labels: Vec<String>,
    row_count: usize,
}

impl Table {
    /// Length of the longest column
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Header labels, with positional defaults filled in
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Cell at a position; `None` past the column's end
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.columns.get(column).and_then(|c| c.get(row))
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.row_count).then_some(Row { table: self, index })
    }

    /// Rows in order, without materializing them
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.row_count).map(move |index| Row { table: self, index })
    }
}

/// One row of a [`Table`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.column_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, column: usize) -> Option<&'a str> {
        self.table.cell(self.index, column)
    }

    /// Cells left to right; absent cells are `None`
    pub fn cells(&self) -> impl Iterator<Item = Option<&'a str>> + 'a {
        let table = self.table;
        let index = self.index;
        table.columns.iter().map(move |column| column.get(index))
    }
}
