//! Multi-sink output writer

use std::io::{self, Write};

/// Writes every buffer to all of its sinks, flushing each after the write.
///
/// Used to mirror container output to the console and a per-job log file.
#[derive(Default)]
pub struct TeeWriter {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl TeeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in &mut self.sinks {
            sink.write_all(buf)?;
            sink.flush()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for TeeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeWriter")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
