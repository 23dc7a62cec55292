//! Error types for legacytrace.
//!
//! - [`enum@Error`] - Main error enum that wraps all error types
//! - [`TraceError`] - Errors from opening and decoding legacy traces
//! - [`WriterError`] - Errors from the threaded output writer
//!
//! Reaching the end of a trace is not an error: read calls return `Ok(None)`.

use thiserror::Error;

use crate::legacy::RecordType;

/// Main error type for legacytrace operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error opening or decoding a legacy trace
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Error from the threaded writer
    #[error("Writer error: {0}")]
    Writer(#[from] WriterError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to legacy trace input.
#[derive(Error, Debug)]
pub enum TraceError {
    /// No format is registered under this name
    #[error("Unknown trace format: {name}")]
    UnknownFormat { name: String },

    /// The byte source failed
    #[error("{operation}({uri}) failed: {source}")]
    SourceRead {
        uri: String,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A header field holds a value the format does not allow
    #[error("{format}: malformed record, invalid {field}: {reason}")]
    MalformedRecord {
        format: &'static str,
        field: &'static str,
        reason: String,
    },

    /// The start time could not be recovered from the trace name
    #[error("Cannot determine start time from {uri}: {reason}")]
    EpochParse { uri: String, reason: String },

    /// The trace has already been closed
    #[error("Trace {uri} is closed")]
    SourceClosed { uri: String },

    /// The packet does not hold a record of the queried format
    #[error("{format}: packet holds no {format} record (found {found:?})")]
    RecordMismatch {
        format: &'static str,
        found: Option<RecordType>,
    },

    /// A buffer handed to `prepare_packet` cannot hold the framing header
    #[error("{format}: buffer too short (need {needed} bytes, have {have})")]
    BufferTooShort {
        format: &'static str,
        needed: usize,
        have: usize,
    },
}

/// Errors related to the threaded writer.
#[derive(Error, Debug)]
pub enum WriterError {
    /// Pool dimensions are unusable
    #[error("Invalid writer configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The consumer thread could not be started
    #[error("Failed to spawn writer thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The consumer failed to write a drained slot to the sink
    #[error("Failed to drain buffer to sink: {0}")]
    Drain(#[source] std::io::Error),

    /// The sink failed to close
    #[error("Failed to close sink: {0}")]
    Sink(#[source] std::io::Error),

    /// The consumer thread panicked
    #[error("Writer thread panicked")]
    ConsumerPanicked,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
