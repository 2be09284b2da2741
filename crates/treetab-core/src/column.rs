//! Column selectors
//!
//! A [`ColumnSelector`] turns one path expression into one column. A
//! [`ColumnGroup`] turns every element matched by its expression into its own
//! column, which is how documents that already store data column-wise
//! (`<column label="x"><v>1</v>...</column>`) are exported.

use crate::document::{Document, NodeId};
use crate::error::{Result, TreetabError};
use crate::selector::{Match, Selector};
use crate::table::Column;
use tracing::trace;

/// How a column obtains its header label
#[derive(Debug, Clone, Default)]
pub enum LabelRule {
    /// No label; the table substitutes a positional default
    #[default]
    None,
    /// A fixed string
    Fixed(String),
    /// Attribute of the first matched element
    Attribute(String),
    /// Value of the first node matched by a selector, evaluated relative to
    /// the first matched node
    Select(Selector),
}

impl LabelRule {
    /// Resolve against an optional context node
    fn resolve(&self, doc: &Document, context: Option<NodeId>) -> Option<String> {
        match self {
            LabelRule::None => None,
            LabelRule::Fixed(label) => Some(label.clone()),
            LabelRule::Attribute(name) => {
                context.and_then(|node| doc.attribute(node, name).map(str::to_string))
            }
            LabelRule::Select(selector) => selector
                .values_from(doc, context.unwrap_or_else(|| doc.root()))
                .into_iter()
                .next(),
        }
    }
}

/// One path expression producing one column
#[derive(Debug, Clone)]
pub struct ColumnSelector {
    selector: Selector,
    label: LabelRule,
}

impl ColumnSelector {
    /// Compile a column expression with no label rule
    pub fn new(expr: &str) -> Result<Self> {
        Ok(Self {
            selector: Selector::compile(expr)?,
            label: LabelRule::None,
        })
    }

    /// Set the label rule
    pub fn with_label(mut self, label: LabelRule) -> Self {
        self.label = label;
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn label_rule(&self) -> &LabelRule {
        &self.label
    }

    /// Evaluate against a document; zero matches give an empty column
    pub fn evaluate(&self, doc: &Document) -> Column {
        let matches = self.selector.select(doc);
        let label = self
            .label
            .resolve(doc, matches.first().map(Match::node));
        let cells: Vec<String> = matches.iter().map(|m| m.value(doc)).collect();
        trace!("{} matched {} node(s)", self.selector, cells.len());
        Column::new(label, cells)
    }
}

/// One path expression producing a column per matched element
#[derive(Debug, Clone)]
pub struct ColumnGroup {
    selector: Selector,
    cells: Selector,
    label: LabelRule,
}

impl ColumnGroup {
    /// `expr` picks the column elements, `cells` picks the cells within each
    pub fn new(expr: &str, cells: &str) -> Result<Self> {
        Ok(Self {
            selector: Selector::compile(expr)?,
            cells: Selector::compile(cells)?,
            label: LabelRule::None,
        })
    }

    /// Set the label rule, applied to each column element
    ///
    /// A fixed label would give every column of the group the same header,
    /// so it is rejected.
    pub fn with_label(mut self, label: LabelRule) -> Result<Self> {
        if let LabelRule::Fixed(_) = label {
            return Err(TreetabError::Config(format!(
                "Column group '{}' cannot use a fixed label",
                self.selector
            )));
        }
        self.label = label;
        Ok(self)
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn cells(&self) -> &Selector {
        &self.cells
    }

    pub fn evaluate(&self, doc: &Document) -> Vec<Column> {
        self.selector
            .select(doc)
            .into_iter()
            .map(|element| {
                let node = element.node();
                let label = self.label.resolve(doc, Some(node));
                Column::new(label, self.cells.values_from(doc, node))
            })
            .collect()
    }
}

/// A configured source of columns
#[derive(Debug, Clone)]
pub enum ColumnSource {
    Single(ColumnSelector),
    Group(ColumnGroup),
}

impl ColumnSource {
    /// Evaluate into zero or more columns, in document order
    pub fn evaluate(&self, doc: &Document) -> Vec<Column> {
        match self {
            ColumnSource::Single(selector) => vec![selector.evaluate(doc)],
            ColumnSource::Group(group) => group.evaluate(doc),
        }
    }

    /// Expression that selects the column (or the group's elements)
    pub fn expr(&self) -> &str {
        match self {
            ColumnSource::Single(selector) => selector.selector().expr(),
            ColumnSource::Group(group) => group.selector().expr(),
        }
    }
}

impl From<ColumnSelector> for ColumnSource {
    fn from(selector: ColumnSelector) -> Self {
        ColumnSource::Single(selector)
    }
}

impl From<ColumnGroup> for ColumnSource {
    fn from(group: ColumnGroup) -> Self {
        ColumnSource::Group(group)
    }
}
