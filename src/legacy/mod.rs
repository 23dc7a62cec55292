//! Legacy fixed-size trace record formats.
//!
//! Four record layouts predate modern capture formats:
//!
//! | Format | Record | Header | Capture len | Wire len |
//! |--------|--------|--------|-------------|----------|
//! | `legacyeth` | 64 | 10 | 64 | header field |
//! | `legacypos` | 64 | 16 | 64 | header field, big-endian, must be > 0 |
//! | `legacyatm` | 64 | 12 | 64 | 53 |
//! | `legacynzix` | 68 | 14 | 54 | header field |
//!
//! Each format is a [`RecordFormat`] implementation; [`BuiltinFormat`]
//! dispatches over all of them and [`FormatRegistry`] selects one by name.
//! [`LegacyTrace`] ties a format to a byte source and decodes packets into
//! [`PacketBuffer`]s.

mod atm;
mod ethernet;
mod layout;
mod nzix;
mod packet;
mod pos;
mod registry;
mod timestamp;
mod trace;

pub use atm::AtmFormat;
pub use ethernet::EthernetFormat;
pub use layout::{LinkType, RecordType, NZIX_RECORD_LEN, RECORD_LEN};
pub use nzix::NzixFormat;
pub use packet::{PacketBuffer, PacketData, Timeval};
pub use pos::PosFormat;
pub use registry::{default_registry, BuiltinFormat, FormatRegistry, RecordAction, RecordFormat};
pub use timestamp::{parse_start_epoch, TimestampReconstructor};
pub use trace::{FormatState, LegacyTrace, PacketReader, RawPacket};
