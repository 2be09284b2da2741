//! Open sinks and fan-out writing

use crate::error::{Result, TreetabError};
use crate::sink::{SinkDescriptor, SinkHandle};
use std::io::{self, Write};
use tracing::debug;

/// A sink opened for the current pass
pub(crate) struct OpenSink {
    pub descriptor: SinkDescriptor,
    handle: Option<Box<dyn SinkHandle>>,
    pub bytes: u64,
}

impl OpenSink {
    pub fn new(descriptor: SinkDescriptor, handle: Box<dyn SinkHandle>) -> Self {
        Self {
            descriptor,
            handle: Some(handle),
            bytes: 0,
        }
    }

    fn handle(&mut self) -> io::Result<&mut Box<dyn SinkHandle>> {
        self.handle
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "sink already closed"))
    }

    /// Close the handle; a second call is a no-op
    pub fn close(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => {
                handle
                    .close()
                    .map_err(|e| TreetabError::sink(self.descriptor.path(), e))?;
                debug!("Closed '{}'", self.descriptor.path().display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Writes every buffer to each of its sinks
///
/// The first failure poisons the fan-out: later writes and flushes, including
/// the one a dropped writer issues for its buffered tail, reach no sink.
pub(crate) struct FanOut<'a> {
    targets: Vec<&'a mut OpenSink>,
    failed: bool,
}

impl<'a> FanOut<'a> {
    pub fn new(targets: Vec<&'a mut OpenSink>) -> Self {
        Self {
            targets,
            failed: false,
        }
    }

    fn check(&self) -> io::Result<()> {
        if self.failed {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "write aborted after an earlier sink failure",
            ));
        }
        Ok(())
    }
}

fn annotate(sink: &OpenSink, err: io::Error) -> io::Error {
    io::Error::new(
        err.kind(),
        format!("{}: {}", sink.descriptor.path().display(), err),
    )
}

impl Write for FanOut<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        for sink in self.targets.iter_mut() {
            match sink.handle().and_then(|h| h.write_all(buf)) {
                Ok(()) => sink.bytes += buf.len() as u64,
                Err(e) => {
                    self.failed = true;
                    return Err(annotate(sink, e));
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        for sink in self.targets.iter_mut() {
            if let Err(e) = sink.handle().and_then(|h| h.flush()) {
                self.failed = true;
                return Err(annotate(sink, e));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::sink::{MemorySinks, SinkOpener};

    fn open(sinks: &MemorySinks, path: &str) -> OpenSink {
        let descriptor = SinkDescriptor::new(path, Format::DelimitedText);
        let handle = sinks.open(&descriptor).unwrap();
        OpenSink::new(descriptor, handle)
    }

    #[test]
    fn test_failure_stops_every_later_write() {
        let sinks = MemorySinks::new();
        sinks.fail_on_write("/b.csv");
        let mut a = open(&sinks, "/a.csv");
        let mut b = open(&sinks, "/b.csv");

        {
            let mut fan = FanOut::new(vec![&mut a, &mut b]);
            let err = fan.write(b"x,y\n").unwrap_err();
            assert!(err.to_string().starts_with("/b.csv: "));
            assert!(fan.write(b"x,y\n").is_err());
            assert!(fan.flush().is_err());
        }

        assert_eq!(sinks.text("/a.csv").unwrap(), "x,y\n");
        assert_eq!(a.bytes, 4);
        assert_eq!(b.bytes, 0);

        a.close().unwrap();
        b.close().unwrap();
        a.close().unwrap();
        assert_eq!(sinks.closed(), 2);
    }
}
