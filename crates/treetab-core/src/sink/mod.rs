//! Sink descriptors and the sink-opening seam
//!
//! A [`SinkDescriptor`] is a resolved output destination: a concrete path and
//! the format inferred from its extension. Opening it is delegated to a
//! [`SinkOpener`], so the export engine never touches the file system itself.

mod memory;

pub use memory::MemorySinks;

use crate::context::RuntimeContext;
use crate::error::Result;
use crate::format::{Format, FormatRegistry};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A resolved sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkDescriptor {
    template: String,
    path: PathBuf,
    format: Format,
}

impl SinkDescriptor {
    /// Resolve a pathname template and infer its format
    pub fn resolve(
        template: &str,
        context: &RuntimeContext,
        registry: &FormatRegistry,
    ) -> Result<Self> {
        let path = context.resolve_path(template)?;
        let format = registry.resolve(&path)?;
        Ok(Self {
            template: template.to_string(),
            path,
            format,
        })
    }

    /// Descriptor for an already concrete path
    pub fn new(path: impl Into<PathBuf>, format: Format) -> Self {
        let path = path.into();
        Self {
            template: path.display().to_string(),
            path,
            format,
        }
    }

    /// Configured template the path was resolved from
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

/// An open output destination
pub trait SinkHandle: Write {
    /// Flush and release the destination
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens sinks for writing, truncating existing content
pub trait SinkOpener {
    fn open(&self, sink: &SinkDescriptor) -> Result<Box<dyn SinkHandle>>;
}

impl<T: SinkOpener + ?Sized> SinkOpener for &T {
    fn open(&self, sink: &SinkDescriptor) -> Result<Box<dyn SinkHandle>> {
        (**self).open(sink)
    }
}
