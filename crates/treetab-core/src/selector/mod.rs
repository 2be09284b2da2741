//! Path selectors
//!
//! A small XPath-like location path language used to pick cell values out of a
//! [`Document`]. Expressions are compiled once, when the export plan is built,
//! so a malformed expression is reported before any sink is touched.
//!
//! # Syntax
//!
//! - `/log/sample` absolute path from the document node
//! - `sample/value` relative path from the context node
//! - `//value` descendant-or-self at any depth
//! - `*`, `.`, `..`, `text()`, `@name`, `@*`
//! - predicates: `[2]`, `[last()]`, `[@kind]`, `[@kind='a']`, `[name]`, `[name='x']`

mod parser;

use crate::document::{Document, NodeId, NodeKind};
use crate::error::Result;
use parser::{NodeTest, Path, Predicate, Step};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One node matched by a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// An element, text or document node
    Node(NodeId),
    /// The attribute at this index on the element
    Attribute(NodeId, usize),
}

impl Match {
    /// The node itself, or the element owning the attribute
    pub fn node(&self) -> NodeId {
        match self {
            Match::Node(id) | Match::Attribute(id, _) => *id,
        }
    }

    /// Textual value of the match
    pub fn value(&self, doc: &Document) -> String {
        match self {
            Match::Node(id) => doc.string_value(*id),
            Match::Attribute(id, index) => doc
                .attributes(*id)
                .get(*index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
        }
    }

    fn order_key(&self) -> (NodeId, u8, usize) {
        match self {
            Match::Node(id) => (*id, 0, 0),
            Match::Attribute(id, index) => (*id, 1, *index),
        }
    }
}

impl PartialOrd for Match {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Attributes sort after their element and before its children.
impl Ord for Match {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// A compiled path expression
#[derive(Debug, Clone)]
pub struct Selector {
    expr: String,
    path: Path,
}

impl Selector {
    /// Compile an expression
    pub fn compile(expr: &str) -> Result<Self> {
        let path = parser::parse(expr)?;
        Ok(Self {
            expr: expr.trim().to_string(),
            path,
        })
    }

    /// Source expression
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn is_absolute(&self) -> bool {
        self.path.absolute
    }

    /// Evaluate from the document node
    pub fn select(&self, doc: &Document) -> Vec<Match> {
        self.select_from(doc, doc.root())
    }

    /// Evaluate with `context` as the starting node for relative expressions
    pub fn select_from(&self, doc: &Document, context: NodeId) -> Vec<Match> {
        let start = if self.path.absolute { doc.root() } else { context };
        let mut current = vec![Match::Node(start)];

        for step in &self.path.steps {
            let mut next = Vec::new();
            for matched in &current {
                // Attribute matches have no children to step into.
                let Match::Node(node) = *matched else {
                    continue;
                };
                let bases = if step.descend {
                    doc.descendants_or_self(node)
                } else {
                    vec![node]
                };
                for base in bases {
                    next.extend(apply_step(doc, base, step));
                }
            }
            next.sort();
            next.dedup();
            current = next;
        }

        current
    }

    /// String values of every match, in document order
    pub fn values(&self, doc: &Document) -> Vec<String> {
        self.values_from(doc, doc.root())
    }

    pub fn values_from(&self, doc: &Document, context: NodeId) -> Vec<String> {
        self.select_from(doc, context)
            .iter()
            .map(|m| m.value(doc))
            .collect()
    }
}

impl FromStr for Selector {
    type Err = crate::error::TreetabError;

    fn from_str(s: &str) -> Result<Self> {
        Selector::compile(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

fn apply_step(doc: &Document, base: NodeId, step: &Step) -> Vec<Match> {
    let mut candidates: Vec<Match> = match &step.test {
        NodeTest::Name(name) => doc
            .child_elements(base)
            .filter(|child| doc.name(*child) == Some(name.as_str()))
            .map(Match::Node)
            .collect(),
        NodeTest::AnyElement => doc.child_elements(base).map(Match::Node).collect(),
        NodeTest::SelfNode => vec![Match::Node(base)],
        NodeTest::Parent => doc.parent(base).map(Match::Node).into_iter().collect(),
        NodeTest::Text => doc
            .children(base)
            .iter()
            .filter(|child| doc.is_text(**child))
            .map(|child| Match::Node(*child))
            .collect(),
        NodeTest::Attribute(name) => doc
            .attributes(base)
            .iter()
            .position(|attr| &attr.name == name)
            .map(|index| Match::Attribute(base, index))
            .into_iter()
            .collect(),
        NodeTest::AnyAttribute => (0..doc.attributes(base).len())
            .map(|index| Match::Attribute(base, index))
            .collect(),
    };

    for predicate in &step.predicates {
        candidates = filter(doc, candidates, predicate);
    }
    candidates
}

fn filter(doc: &Document, candidates: Vec<Match>, predicate: &Predicate) -> Vec<Match> {
    match predicate {
        Predicate::Position(position) => candidates
            .get(position - 1)
            .copied()
            .into_iter()
            .collect(),
        Predicate::Last => candidates.last().copied().into_iter().collect(),
        _ => candidates
            .into_iter()
            .filter(|candidate| holds(doc, candidate, predicate))
            .collect(),
    }
}

fn holds(doc: &Document, candidate: &Match, predicate: &Predicate) -> bool {
    let Match::Node(node) = *candidate else {
        return false;
    };
    if !matches!(doc.kind(node), NodeKind::Element { .. }) {
        return false;
    }
    match predicate {
        Predicate::HasAttribute(name) => doc.attribute(node, name).is_some(),
        Predicate::AttributeEquals(name, value) => {
            doc.attribute(node, name) == Some(value.as_str())
        }
        Predicate::HasChild(name) => doc.first_child_element(node, name).is_some(),
        Predicate::ChildEquals(name, value) => doc
            .child_elements(node)
            .any(|child| doc.name(child) == Some(name.as_str()) && doc.string_value(child) == *value),
        Predicate::Position(_) | Predicate::Last => true,
    }
}
