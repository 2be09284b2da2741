//! File system sinks

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::debug;
use treetab_core::error::{Result, TreetabError};
use treetab_core::sink::{SinkDescriptor, SinkHandle, SinkOpener};

/// Opens sinks as buffered files
pub struct FileSystemSinks {
    /// Create missing parent directories on open
    create_dirs: bool,
}

impl FileSystemSinks {
    /// Create an opener
    pub fn new(create_dirs: bool) -> Self {
        Self { create_dirs }
    }

    pub fn creates_dirs(&self) -> bool {
        self.create_dirs
    }

    /// Ensure the parent directory of a sink exists
    fn ensure_parent(&self, sink: &SinkDescriptor) -> Result<()> {
        let Some(parent) = sink.path().parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() || parent.exists() {
            return Ok(());
        }
        fs::create_dir_all(parent).map_err(|e| TreetabError::sink(sink.path(), e))?;
        debug!("Created directory: {:?}", parent);
        Ok(())
    }
}

impl Default for FileSystemSinks {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SinkOpener for FileSystemSinks {
    fn open(&self, sink: &SinkDescriptor) -> Result<Box<dyn SinkHandle>> {
        if self.create_dirs {
            self.ensure_parent(sink)?;
        }

        // Truncates any existing content
        let file = fs::File::create(sink.path()).map_err(|e| TreetabError::sink(sink.path(), e))?;
        debug!("Opened {:?} ({})", sink.path(), sink.format());

        Ok(Box::new(FileSink {
            path: sink.path().to_path_buf(),
            writer: BufWriter::new(file),
        }))
    }
}

/// An open sink file
struct FileSink {
    path: PathBuf,
    writer: BufWriter<fs::File>,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl SinkHandle for FileSink {
    fn close(self: Box<Self>) -> io::Result<()> {
        let FileSink { path, writer } = *self;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        debug!("Closed {:?}", path);
        Ok(())
    }
}
