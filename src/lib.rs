//! # legacytrace
//!
//! Decoding of legacy fixed-size packet trace records, and an asynchronous
//! buffered writer for trace output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use legacytrace::prelude::*;
//!
//! let trace = LegacyTrace::open("legacynzix", "/traces/20000607-142312.nzix").unwrap();
//! for packet in trace {
//!     let packet = packet.unwrap();
//!     println!("{} {} {}", packet.frame_number, packet.timestamp_us, packet.original_len);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          legacytrace                                |
//! +---------------------------------------------------------------------+
//! |  legacy/   - RecordFormat trait, eth/pos/atm/nzix formats, registry |
//! |              PacketBuffer, NZIX timestamp reconstruction, traces    |
//! |  io/       - ByteSource / ByteSink, ThreadedWriter                  |
//! |  error/    - Error types                                            |
//! +---------------------------------------------------------------------+
//! ```

pub mod error;
pub mod io;
pub mod legacy;
pub mod prelude;

pub use error::{Error, Result, TraceError, WriterError};
pub use io::{ByteSink, ByteSource, ThreadedWriter, WriterConfig};
pub use legacy::{
    default_registry, BuiltinFormat, FormatRegistry, LegacyTrace, LinkType, PacketBuffer,
    PacketReader, RawPacket, RecordFormat, RecordType, Timeval,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
