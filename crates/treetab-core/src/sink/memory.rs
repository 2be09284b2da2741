//! In-memory sinks

use super::{SinkDescriptor, SinkHandle, SinkOpener};
use crate::error::{Result, TreetabError};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    open: BTreeSet<PathBuf>,
    opened: usize,
    closed: usize,
    fail_open: BTreeSet<PathBuf>,
    fail_write: BTreeSet<PathBuf>,
    fail_close: BTreeSet<PathBuf>,
}

/// Sinks that keep their content in memory
///
/// Clones share the same storage, so a caller can keep one clone to inspect
/// what an engine wrote through another. Failures can be injected per path.
#[derive(Debug, Clone, Default)]
pub struct MemorySinks {
    state: Rc<RefCell<State>>,
}

impl MemorySinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make opening this path fail
    pub fn fail_on_open(&self, path: impl Into<PathBuf>) -> &Self {
        self.state.borrow_mut().fail_open.insert(path.into());
        self
    }

    /// Make every write to this path fail
    pub fn fail_on_write(&self, path: impl Into<PathBuf>) -> &Self {
        self.state.borrow_mut().fail_write.insert(path.into());
        self
    }

    /// Make closing this path fail (the handle is still released)
    pub fn fail_on_close(&self, path: impl Into<PathBuf>) -> &Self {
        self.state.borrow_mut().fail_close.insert(path.into());
        self
    }

    /// Bytes written to a path, if it was ever opened
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state.borrow().files.get(path.as_ref()).cloned()
    }

    /// Contents as UTF-8 text
    pub fn text(&self, path: impl AsRef<Path>) -> Option<String> {
        self.contents(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Every path opened so far
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.borrow().files.keys().cloned().collect()
    }

    /// Handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.state.borrow().open.len()
    }

    pub fn opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn closed(&self) -> usize {
        self.state.borrow().closed
    }
}

impl SinkOpener for MemorySinks {
    fn open(&self, sink: &SinkDescriptor) -> Result<Box<dyn SinkHandle>> {
        let path = sink.path().to_path_buf();
        let mut state = self.state.borrow_mut();
        if state.fail_open.contains(&path) {
            return Err(TreetabError::sink(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "open refused"),
            ));
        }
        state.files.insert(path.clone(), Vec::new());
        state.open.insert(path.clone());
        state.opened += 1;
        Ok(Box::new(MemoryHandle {
            path,
            state: Rc::clone(&self.state),
        }))
    }
}

struct MemoryHandle {
    path: PathBuf,
    state: Rc<RefCell<State>>,
}

impl Write for MemoryHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.fail_write.contains(&self.path) {
            return Err(io::Error::new(io::ErrorKind::Other, "write refused"));
        }
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkHandle for MemoryHandle {
    fn close(self: Box<Self>) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        state.open.remove(&self.path);
        state.closed += 1;
        if state.fail_close.contains(&self.path) {
            return Err(io::Error::new(io::ErrorKind::Other, "close refused"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;

    #[test]
    fn test_write_and_close() {
        let sinks = MemorySinks::new();
        let descriptor = SinkDescriptor::new("/m/a.csv", Format::DelimitedText);

        let mut handle = sinks.open(&descriptor).unwrap();
        handle.write_all(b"a,b\n").unwrap();
        assert_eq!(sinks.open_handles(), 1);
        handle.close().unwrap();

        assert_eq!(sinks.open_handles(), 0);
        assert_eq!(sinks.text("/m/a.csv").unwrap(), "a,b\n");
    }

    #[test]
    fn test_reopen_truncates() {
        let sinks = MemorySinks::new();
        let descriptor = SinkDescriptor::new("/m/a.bin", Format::FixedWidthBinary);
        for payload in [&b"long payload"[..], &b"x"[..]] {
            let mut handle = sinks.open(&descriptor).unwrap();
            handle.write_all(payload).unwrap();
            handle.close().unwrap();
        }
        assert_eq!(sinks.contents("/m/a.bin").unwrap(), b"x");
    }

    #[test]
    fn test_injected_failures() {
        let sinks = MemorySinks::new();
        sinks.fail_on_open("/m/no.csv").fail_on_write("/m/w.csv");

        let no = SinkDescriptor::new("/m/no.csv", Format::DelimitedText);
        assert!(sinks.open(&no).is_err());
        assert!(sinks.contents("/m/no.csv").is_none());

        let w = SinkDescriptor::new("/m/w.csv", Format::DelimitedText);
        let mut handle = sinks.open(&w).unwrap();
        assert!(handle.write_all(b"x").is_err());
        handle.close().unwrap();
        assert_eq!(sinks.closed(), 1);
    }
}
