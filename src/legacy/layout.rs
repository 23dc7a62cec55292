//! On-disk layout of legacy trace records.
//!
//! Every record is a fixed-size unit: a packed framing header followed by the
//! start of the captured frame. Fields the capture host wrote in its native
//! order are little-endian; the POS wire length is big-endian.

use std::fmt;

/// Size of an ATM, Ethernet or POS record.
pub const RECORD_LEN: usize = 64;

/// Size of an NZIX record as stored on disk.
pub const NZIX_RECORD_LEN: usize = 68;

/// ATM cell header: `ts: u64`, then a `crc: u32` nothing reads.
pub mod atm {
    pub const HEADER_LEN: usize = 12;
    pub const TS: usize = 0;
    /// Every cell is 53 bytes on the wire.
    pub const CELL_LEN: u32 = 53;
}

/// Ethernet header: `ts: u64`, `wlen: u16`.
pub mod ether {
    pub const HEADER_LEN: usize = 10;
    pub const TS: usize = 0;
    pub const WLEN: usize = 8;
}

/// POS header: `ts: u64`, `slen: u32`, `wlen: u32` (big-endian lengths).
///
/// The snap length is not read.
pub mod pos {
    pub const HEADER_LEN: usize = 16;
    pub const TS: usize = 0;
    pub const WLEN: usize = 12;

    /// First payload byte of a Cisco HDLC unicast frame.
    pub const HDLC_UNICAST: u8 = 0x0F;
    /// First payload byte of a Cisco HDLC multicast frame.
    pub const HDLC_MULTICAST: u8 = 0x8F;
    /// Cisco HDLC control byte.
    pub const HDLC_CONTROL: u8 = 0x00;
}

/// NZIX header: `ts: u32`, `crc: u32`, `len: u32`, then two pad bytes.
pub mod nzix {
    pub const HEADER_LEN: usize = 14;
    pub const TS: usize = 0;
    pub const LEN: usize = 8;

    /// Offset of the padding as it sits on disk.
    pub const PAD: usize = 12;
    pub const PAD_LEN: usize = 2;
    /// Bytes after the padding that move forward to close the gap.
    pub const SHIFTED_LEN: usize = 26;

    /// Frame bytes stored per record.
    pub const CAPTURE_LEN: u32 = 54;
}

/// Tag attached to every decoded packet naming the format that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RecordType {
    LegacyAtm = 1006,
    LegacyPos = 1007,
    LegacyEth = 1008,
    LegacyNzix = 1014,
}

impl RecordType {
    /// Numeric tag value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Look up a tag by its numeric value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1006 => Some(RecordType::LegacyAtm),
            1007 => Some(RecordType::LegacyPos),
            1008 => Some(RecordType::LegacyEth),
            1014 => Some(RecordType::LegacyNzix),
            _ => None,
        }
    }
}

/// Link layer of a decoded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Ethernet,
    Ppp,
    /// Cisco HDLC over POS
    HdlcPos,
    Atm,
}

impl LinkType {
    /// Equivalent pcap `LINKTYPE_*` value.
    pub fn dlt(self) -> u16 {
        match self {
            LinkType::Ethernet => 1,
            LinkType::Ppp => 9,
            LinkType::Atm => 100,
            LinkType::HdlcPos => 104,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkType::Ethernet => write!(f, "ethernet"),
            LinkType::Ppp => write!(f, "ppp"),
            LinkType::HdlcPos => write!(f, "hdlc"),
            LinkType::Atm => write!(f, "atm"),
        }
    }
}

/// Copy `N` bytes starting at `offset`.
///
/// Callers only pass offsets inside the framing header, which
/// `prepare_packet` guarantees is present.
#[inline]
fn field<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

#[inline]
pub(crate) fn read_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(field(buf, offset))
}

#[inline]
pub(crate) fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(field(buf, offset))
}

#[inline]
pub(crate) fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(field(buf, offset))
}

#[inline]
pub(crate) fn read_u64_le(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(field(buf, offset))
}
