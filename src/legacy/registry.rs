//! Format registry and the operation table every legacy format implements.

use super::layout::{LinkType, RecordType, RECORD_LEN};
use super::packet::{PacketBuffer, PacketData, Timeval};
use super::timestamp::TimestampReconstructor;
use super::trace::{read_record, FormatState};
use super::{AtmFormat, EthernetFormat, NzixFormat, PosFormat};
use crate::error::TraceError;
use crate::io::ByteSource;

/// What the read loop does with a freshly read record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Hand the record to the caller.
    Keep,
    /// Drop the record and read the next one.
    Skip,
}

/// Operations of one legacy record format.
///
/// Capabilities that only some formats have are optional: ERF timestamps
/// and reconstructed timevals come back as `None` where unsupported.
pub trait RecordFormat: Send + Sync {
    /// Name used to select the format (e.g., "legacypos").
    fn name(&self) -> &'static str;

    /// Tag attached to packets this format decodes.
    fn record_type(&self) -> RecordType;

    /// Size of one record on disk.
    fn record_len(&self) -> usize {
        RECORD_LEN
    }

    /// Size of the framing header that precedes the payload.
    fn framing_len(&self) -> usize;

    /// Clock state for formats whose timestamps need per-trace reconstruction.
    fn start_clock(&self, _uri: &str) -> Result<Option<TimestampReconstructor>, TraceError> {
        Ok(None)
    }

    /// Inspect and fix up a raw record in place before it is returned.
    fn fixup_record(&self, _record: &mut [u8]) -> RecordAction {
        RecordAction::Keep
    }

    /// Raw counter fed to the trace clock, for formats that keep one.
    fn clock_counter(&self, _packet: &PacketBuffer) -> Option<u32> {
        None
    }

    /// Link layer of the payload.
    fn link_type(&self, packet: &PacketBuffer) -> LinkType;

    /// Number of captured bytes the record holds.
    fn capture_len(&self, packet: &PacketBuffer) -> u32;

    /// Length of the packet on the wire.
    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError>;

    /// 64-bit ERF timestamp stored in the header.
    fn erf_timestamp(&self, _packet: &PacketBuffer) -> Option<u64> {
        None
    }

    /// Capture time reconstructed while decoding.
    fn timeval(&self, _packet: &PacketBuffer) -> Option<Timeval> {
        None
    }

    /// Usage text for this format.
    fn help(&self) -> String {
        format!(
            "{name} format module\n\
             Supported input URIs:\n\
             \t{name}:/path/to/file\n\
             \t{name}:-\t(stdin)\n\
             \n\
             \te.g.: {name}:/tmp/trace\n",
            name = self.name()
        )
    }

    /// Framing header of `packet`, if it holds a record of this format.
    fn record_header<'a>(&self, packet: &'a PacketBuffer) -> Option<&'a [u8]> {
        let ours = packet.record_type() == Some(self.record_type())
            && packet.framing_len() == self.framing_len();
        ours.then(|| packet.header())
    }

    /// Like [`record_header`](Self::record_header), failing with
    /// `RecordMismatch` for an empty or foreign packet.
    fn expect_header<'a>(&self, packet: &'a PacketBuffer) -> Result<&'a [u8], TraceError> {
        self.record_header(packet).ok_or_else(|| TraceError::RecordMismatch {
            format: self.name(),
            found: packet.record_type(),
        })
    }

    /// Install `data` as the packet's record.
    ///
    /// The previously held buffer is released; an external buffer is only
    /// ever dropped as a handle, never recycled. The payload view is placed
    /// right after this format's framing header.
    fn prepare_packet(
        &self,
        packet: &mut PacketBuffer,
        data: PacketData,
        record_type: RecordType,
    ) -> Result<(), TraceError> {
        let framing_len = self.framing_len();
        if data.len() < framing_len {
            return Err(TraceError::BufferTooShort {
                format: self.name(),
                needed: framing_len,
                have: data.len(),
            });
        }
        packet.install(data, record_type, framing_len);
        Ok(())
    }

    /// Decode the next record from the trace into `packet`.
    ///
    /// Returns the number of bytes consumed, or `None` at end of input.
    fn read_packet<S: ByteSource>(
        &self,
        state: &mut FormatState<S>,
        packet: &mut PacketBuffer,
    ) -> Result<Option<usize>, TraceError>
    where
        Self: Sized,
    {
        read_record(self, state, packet)
    }
}

/// Enum of all built-in legacy formats, for static dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFormat {
    Ethernet(EthernetFormat),
    Pos(PosFormat),
    Atm(AtmFormat),
    Nzix(NzixFormat),
}

impl BuiltinFormat {
    /// Every built-in format.
    pub const ALL: [BuiltinFormat; 4] = [
        BuiltinFormat::Pos(PosFormat),
        BuiltinFormat::Ethernet(EthernetFormat),
        BuiltinFormat::Atm(AtmFormat),
        BuiltinFormat::Nzix(NzixFormat),
    ];

    /// Look up a built-in format by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Look up the format that produces `record_type`.
    pub fn by_record_type(record_type: RecordType) -> Self {
        match record_type {
            RecordType::LegacyEth => BuiltinFormat::Ethernet(EthernetFormat),
            RecordType::LegacyPos => BuiltinFormat::Pos(PosFormat),
            RecordType::LegacyAtm => BuiltinFormat::Atm(AtmFormat),
            RecordType::LegacyNzix => BuiltinFormat::Nzix(NzixFormat),
        }
    }
}

/// Macro to delegate RecordFormat trait methods to inner types.
macro_rules! delegate_format {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            BuiltinFormat::Ethernet(f) => f.$method($($arg),*),
            BuiltinFormat::Pos(f) => f.$method($($arg),*),
            BuiltinFormat::Atm(f) => f.$method($($arg),*),
            BuiltinFormat::Nzix(f) => f.$method($($arg),*),
        }
    };
}

impl RecordFormat for BuiltinFormat {
    #[inline]
    fn name(&self) -> &'static str {
        delegate_format!(self, name)
    }

    #[inline]
    fn record_type(&self) -> RecordType {
        delegate_format!(self, record_type)
    }

    #[inline]
    fn record_len(&self) -> usize {
        delegate_format!(self, record_len)
    }

    #[inline]
    fn framing_len(&self) -> usize {
        delegate_format!(self, framing_len)
    }

    #[inline]
    fn start_clock(&self, uri: &str) -> Result<Option<TimestampReconstructor>, TraceError> {
        delegate_format!(self, start_clock, uri)
    }

    #[inline]
    fn fixup_record(&self, record: &mut [u8]) -> RecordAction {
        delegate_format!(self, fixup_record, record)
    }

    #[inline]
    fn clock_counter(&self, packet: &PacketBuffer) -> Option<u32> {
        delegate_format!(self, clock_counter, packet)
    }

    #[inline]
    fn link_type(&self, packet: &PacketBuffer) -> LinkType {
        delegate_format!(self, link_type, packet)
    }

    #[inline]
    fn capture_len(&self, packet: &PacketBuffer) -> u32 {
        delegate_format!(self, capture_len, packet)
    }

    #[inline]
    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        delegate_format!(self, wire_len, packet)
    }

    #[inline]
    fn erf_timestamp(&self, packet: &PacketBuffer) -> Option<u64> {
        delegate_format!(self, erf_timestamp, packet)
    }

    #[inline]
    fn timeval(&self, packet: &PacketBuffer) -> Option<Timeval> {
        delegate_format!(self, timeval, packet)
    }

    fn help(&self) -> String {
        delegate_format!(self, help)
    }
}

impl From<EthernetFormat> for BuiltinFormat {
    fn from(f: EthernetFormat) -> Self {
        BuiltinFormat::Ethernet(f)
    }
}

impl From<PosFormat> for BuiltinFormat {
    fn from(f: PosFormat) -> Self {
        BuiltinFormat::Pos(f)
    }
}

impl From<AtmFormat> for BuiltinFormat {
    fn from(f: AtmFormat) -> Self {
        BuiltinFormat::Atm(f)
    }
}

impl From<NzixFormat> for BuiltinFormat {
    fn from(f: NzixFormat) -> Self {
        BuiltinFormat::Nzix(f)
    }
}

/// Registry of formats selectable by name.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<BuiltinFormat>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Register a format. A later registration does not shadow an earlier one.
    pub fn register<F: Into<BuiltinFormat>>(&mut self, format: F) {
        self.formats.push(format.into());
    }

    /// Get a format by name.
    pub fn get_format(&self, name: &str) -> Option<&BuiltinFormat> {
        self.formats.iter().find(|f| f.name() == name)
    }

    /// Get all registered formats.
    pub fn all_formats(&self) -> impl Iterator<Item = &BuiltinFormat> {
        self.formats.iter()
    }

    /// Get the number of registered formats.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every built-in legacy format.
pub fn default_registry() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    for format in BuiltinFormat::ALL {
        registry.register(format);
    }
    registry
}
