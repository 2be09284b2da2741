//! Immutable document tree

use crate::error::{Result, TreetabError};
use std::fmt;

/// Index of a node inside a [`Document`]
///
/// Ids are assigned in document order, so sorting ids sorts nodes the way
/// they appear in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in document order
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a node is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; parent of the root element
    Document,
    /// An element with its attributes in source order
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Character data
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Hierarchical document, read-only once built
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element, if any
    pub fn root_element(&self) -> Option<NodeId> {
        self.child_elements(self.root()).next()
    }

    /// Total number of nodes, document node included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document has no root element
    pub fn is_empty(&self) -> bool {
        self.root_element().is_none()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Child elements of a node, skipping text
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    /// First child element with the given name
    pub fn first_child_element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id)
            .find(|child| self.name(*child) == Some(name))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    /// Element name, `None` for text and the document node
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// The node and all of its descendants in document order
    pub fn descendants_or_self(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of the node's subtree
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) => text.clone(),
            _ => {
                let mut value = String::new();
                for node in self.descendants_or_self(id) {
                    if let NodeKind::Text(text) = self.kind(node) {
                        value.push_str(text);
                    }
                }
                value
            }
        }
    }
}

/// Incremental builder used by the parser and by tests
pub struct DocumentBuilder {
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            open: vec![NodeId(0)],
        }
    }

    fn current(&self) -> NodeId {
        *self.open.last().unwrap_or(&NodeId(0))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.current();
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Open a new element under the current one
    pub fn start_element(&mut self, name: impl Into<String>, attributes: Vec<Attribute>) -> &mut Self {
        let id = self.push(NodeKind::Element {
            name: name.into(),
            attributes,
        });
        self.open.push(id);
        self
    }

    /// Close the current element
    pub fn end_element(&mut self) -> Result<&mut Self> {
        if self.open.len() <= 1 {
            return Err(TreetabError::Document(
                "closing tag without matching opening tag".to_string(),
            ));
        }
        self.open.pop();
        Ok(self)
    }

    /// Append text to the current element
    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        if !text.is_empty() {
            self.push(NodeKind::Text(text));
        }
        self
    }

    /// Convenience for `<name>text</name>`
    pub fn leaf(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.start_element(name, Vec::new());
        self.text(text);
        self.open.pop();
        self
    }

    /// Finish the document; every element must be closed
    pub fn build(self) -> Result<Document> {
        if self.open.len() > 1 {
            let unclosed = self.open[1..]
                .iter()
                .filter_map(|id| match &self.nodes[id.0].kind {
                    NodeKind::Element { name, .. } => Some(name.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TreetabError::Document(format!(
                "unclosed element(s): {}",
                unclosed
            )));
        }
        let document = Document { nodes: self.nodes };
        if document
            .children(document.root())
            .iter()
            .filter(|id| document.is_element(**id))
            .count()
            > 1
        {
            return Err(TreetabError::Document(
                "more than one root element".to_string(),
            ));
        }
        Ok(document)
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
