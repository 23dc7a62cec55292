//! Legacy Ethernet records.

use super::layout::{ether, read_u16_le, read_u64_le, LinkType, RecordType, RECORD_LEN};
use super::packet::PacketBuffer;
use super::registry::RecordFormat;
use crate::error::TraceError;

/// 64-byte records holding the start of an Ethernet frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EthernetFormat;

impl RecordFormat for EthernetFormat {
    fn name(&self) -> &'static str {
        "legacyeth"
    }

    fn record_type(&self) -> RecordType {
        RecordType::LegacyEth
    }

    fn framing_len(&self) -> usize {
        ether::HEADER_LEN
    }

    fn link_type(&self, _packet: &PacketBuffer) -> LinkType {
        LinkType::Ethernet
    }

    fn capture_len(&self, _packet: &PacketBuffer) -> u32 {
        RECORD_LEN as u32
    }

    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        let header = self.expect_header(packet)?;
        Ok(read_u16_le(header, ether::WLEN) as u32)
    }

    fn erf_timestamp(&self, packet: &PacketBuffer) -> Option<u64> {
        self.record_header(packet).map(|header| read_u64_le(header, ether::TS))
    }
}
