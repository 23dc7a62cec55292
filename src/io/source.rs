//! Byte sources that legacy traces are decoded from.
//!
//! Decoding only needs two things from its input: a way to pull bytes and a
//! way to let go of the handle. Anything implementing [`std::io::Read`] is a
//! source, so files, stdin, decompressing readers and in-memory cursors all
//! plug in without adapters.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{Error, TraceError};

/// Buffer size for file sources (64KB).
const BUFFER_SIZE: usize = 65536;

/// Path that selects standard input instead of a file.
pub const STDIO_PATH: &str = "-";

/// Source of raw trace bytes.
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes read. `Ok(0)` means end of input; a short
    /// count is not an error and the caller is expected to read again.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the underlying handle.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read + Send> ByteSource for R {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match Read::read(self, buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}

/// Buffered source over a file or standard input.
pub type FileSource = BufReader<Box<dyn Read + Send>>;

/// Open `path` for reading, or standard input when `path` is `-`.
pub fn open_file_source<P: AsRef<Path>>(path: P) -> Result<FileSource, Error> {
    let path = path.as_ref();

    let reader: Box<dyn Read + Send> = if path.as_os_str() == STDIO_PATH {
        Box::new(io::stdin())
    } else {
        let file = File::open(path).map_err(|e| TraceError::SourceRead {
            uri: path.display().to_string(),
            operation: "open",
            source: e,
        })?;
        Box::new(file)
    };

    Ok(BufReader::with_capacity(BUFFER_SIZE, reader))
}
