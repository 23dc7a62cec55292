//! Byte sinks that trace output is drained to.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::source::STDIO_PATH;
use crate::error::Error;

/// Destination for raw output bytes.
///
/// Sinks are moved onto the writer's consumer thread, hence `Send + 'static`.
pub trait ByteSink: Send + 'static {
    /// Write the whole of `buf`, blocking as long as the sink needs.
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Flush and release the underlying handle.
    fn close(&mut self) -> io::Result<()>;
}

impl<W: Write + Send + 'static> ByteSink for W {
    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

/// Buffered sink over a file or standard output.
pub type FileSink = BufWriter<Box<dyn Write + Send>>;

/// Create (or truncate) `path` for writing, or use standard output when `path` is `-`.
pub fn create_file_sink<P: AsRef<Path>>(path: P) -> Result<FileSink, Error> {
    let path = path.as_ref();

    let writer: Box<dyn Write + Send> = if path.as_os_str() == STDIO_PATH {
        Box::new(io::stdout())
    } else {
        Box::new(File::create(path)?)
    };

    Ok(BufWriter::new(writer))
}
