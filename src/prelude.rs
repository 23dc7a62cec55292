//! Convenient re-exports for common usage.
//!
//! # Example
//!
//! ```rust,no_run
//! use legacytrace::prelude::*;
//!
//! let registry = default_registry();
//! let format = registry.get_format("legacypos").unwrap();
//! println!("{}", format.help());
//! ```

// Format types
pub use crate::legacy::{
    default_registry, BuiltinFormat, FormatRegistry, LinkType, RecordFormat, RecordType,
};

// Trace types
pub use crate::legacy::{LegacyTrace, PacketBuffer, PacketReader, RawPacket, Timeval};

// I/O types
pub use crate::io::{ByteSink, ByteSource, ThreadedWriter, WriterConfig};

// Error types
pub use crate::error::{Error, Result};
