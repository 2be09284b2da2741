//! XML loader

use super::model::{Attribute, Document, DocumentBuilder};
use crate::error::{Result, TreetabError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use tracing::debug;

/// Parse an XML string into a [`Document`]
///
/// Whitespace-only text is dropped and remaining text is trimmed, so
/// pretty-printed input yields the same cell values as compact input.
pub fn parse_str(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = DocumentBuilder::new();
    loop {
        let event = reader.read_event().map_err(|e| {
            TreetabError::Document(format!("at byte {}: {}", reader.error_position(), e))
        })?;
        match event {
            Event::Start(start) => {
                let (name, attributes) = element_parts(&start)?;
                builder.start_element(name, attributes);
            }
            Event::Empty(start) => {
                let (name, attributes) = element_parts(&start)?;
                builder.start_element(name, attributes);
                builder.end_element()?;
            }
            Event::End(_) => {
                builder.end_element()?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| TreetabError::Document(e.to_string()))?;
                builder.text(text.into_owned());
            }
            Event::CData(cdata) => {
                let text = String::from_utf8(cdata.into_inner().into_owned())
                    .map_err(|e| TreetabError::Document(e.to_string()))?;
                builder.text(text);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry no cell data.
            _ => {}
        }
    }

    let document = builder.build()?;
    if document.is_empty() {
        return Err(TreetabError::Document("no root element".to_string()));
    }
    debug!("Parsed document with {} nodes", document.len());
    Ok(document)
}

/// Read and parse an XML file
pub fn parse_file(path: &Path) -> Result<Document> {
    let xml = std::fs::read_to_string(path).map_err(|e| {
        TreetabError::Io(e).with_context(format!("Failed to read {}", path.display()))
    })?;
    parse_str(&xml).map_err(|e| e.with_context(format!("Failed to parse {}", path.display())))
}

fn element_parts(start: &BytesStart<'_>) -> Result<(String, Vec<Attribute>)> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| TreetabError::Document(e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| TreetabError::Document(format!("<{}>: {}", name, e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| TreetabError::Document(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| TreetabError::Document(format!("<{}>: {}", name, e)))?
            .into_owned();
        attributes.push(Attribute::new(key, value));
    }

    Ok((name, attributes))
}
