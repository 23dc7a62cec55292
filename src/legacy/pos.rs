//! Legacy Packet-over-SONET records.
//!
//! POS traces mix PPP and Cisco HDLC framing; the link type is decided per
//! packet from the first two payload bytes.

use super::layout::{pos, read_u32_be, read_u64_le, LinkType, RecordType, RECORD_LEN};
use super::packet::PacketBuffer;
use super::registry::RecordFormat;
use crate::error::TraceError;

/// 64-byte records holding the start of a POS frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PosFormat;

impl RecordFormat for PosFormat {
    fn name(&self) -> &'static str {
        "legacypos"
    }

    fn record_type(&self) -> RecordType {
        RecordType::LegacyPos
    }

    fn framing_len(&self) -> usize {
        pos::HEADER_LEN
    }

    fn link_type(&self, packet: &PacketBuffer) -> LinkType {
        match packet.payload() {
            [pos::HDLC_UNICAST | pos::HDLC_MULTICAST, pos::HDLC_CONTROL, ..] => LinkType::HdlcPos,
            _ => LinkType::Ppp,
        }
    }

    fn capture_len(&self, _packet: &PacketBuffer) -> u32 {
        RECORD_LEN as u32
    }

    /// Wire length from the header. Zero, or a value that does not fit a
    /// signed 32-bit length, marks a corrupt record.
    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        let wlen = read_u32_be(self.expect_header(packet)?, pos::WLEN);
        if wlen == 0 || wlen > i32::MAX as u32 {
            return Err(TraceError::MalformedRecord {
                format: self.name(),
                field: "wlen",
                reason: format!("wire length must be positive, got {}", wlen as i32),
            });
        }
        Ok(wlen)
    }

    fn erf_timestamp(&self, packet: &PacketBuffer) -> Option<u64> {
        self.record_header(packet).map(|header| read_u64_le(header, pos::TS))
    }
}
