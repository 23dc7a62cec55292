//! Byte-level I/O for legacy traces.
//!
//! ## Input
//!
//! Record decoders pull from a [`ByteSource`]. Every `std::io::Read` is a
//! source; [`open_file_source`] opens a file (or stdin for `-`).
//!
//! ## Output
//!
//! [`ThreadedWriter`] decouples producers from slow [`ByteSink`]s with a fixed
//! pool of buffers drained by a dedicated thread. Every `std::io::Write` is a
//! sink; [`create_file_sink`] creates a file (or stdout for `-`).

mod sink;
mod source;
mod threaded;

pub use sink::{create_file_sink, ByteSink, FileSink};
pub use source::{open_file_source, ByteSource, FileSource, STDIO_PATH};
pub use threaded::{ThreadedWriter, WriterConfig, DEFAULT_BUFFERS, DEFAULT_BUFFER_SIZE};
