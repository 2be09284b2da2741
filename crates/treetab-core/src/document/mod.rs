//! Document model
//!
//! An immutable arena tree loaded from XML. Selectors evaluate against it and
//! the export engine only ever borrows it.

mod model;
mod parser;

pub use model::{Attribute, Document, DocumentBuilder, NodeId, NodeKind};
pub use parser::{parse_file, parse_str};
