//! Legacy ATM cell records.

use super::layout::{atm, read_u64_le, LinkType, RecordType, RECORD_LEN};
use super::packet::PacketBuffer;
use super::registry::RecordFormat;
use crate::error::TraceError;

/// 64-byte records holding a single ATM cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtmFormat;

impl RecordFormat for AtmFormat {
    fn name(&self) -> &'static str {
        "legacyatm"
    }

    fn record_type(&self) -> RecordType {
        RecordType::LegacyAtm
    }

    fn framing_len(&self) -> usize {
        atm::HEADER_LEN
    }

    fn link_type(&self, _packet: &PacketBuffer) -> LinkType {
        LinkType::Atm
    }

    fn capture_len(&self, _packet: &PacketBuffer) -> u32 {
        RECORD_LEN as u32
    }

    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        self.expect_header(packet)?;
        Ok(atm::CELL_LEN)
    }

    fn erf_timestamp(&self, packet: &PacketBuffer) -> Option<u64> {
        self.record_header(packet).map(|header| read_u64_le(header, atm::TS))
    }
}
