//! Legacy NZIX records.
//!
//! NZIX records are 68 bytes on disk with two bytes of padding in the middle
//! of the frame. Decoding moves the padding into the framing header so the
//! payload is contiguous. Records with a zero length field are out-of-band
//! GPS timing markers and are skipped.

use super::layout::{nzix, read_u32_le, LinkType, RecordType, NZIX_RECORD_LEN};
use super::packet::{PacketBuffer, Timeval};
use super::registry::{RecordAction, RecordFormat};
use super::timestamp::TimestampReconstructor;
use crate::error::TraceError;

/// 68-byte records with a 30-bit counter timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NzixFormat;

impl RecordFormat for NzixFormat {
    fn name(&self) -> &'static str {
        "legacynzix"
    }

    fn record_type(&self) -> RecordType {
        RecordType::LegacyNzix
    }

    fn record_len(&self) -> usize {
        NZIX_RECORD_LEN
    }

    fn framing_len(&self) -> usize {
        nzix::HEADER_LEN
    }

    fn start_clock(&self, uri: &str) -> Result<Option<TimestampReconstructor>, TraceError> {
        TimestampReconstructor::from_uri(uri).map(Some)
    }

    fn fixup_record(&self, record: &mut [u8]) -> RecordAction {
        if read_u32_le(record, nzix::LEN) == 0 {
            return RecordAction::Skip;
        }
        realign(record);
        RecordAction::Keep
    }

    fn clock_counter(&self, packet: &PacketBuffer) -> Option<u32> {
        self.record_header(packet).map(|header| read_u32_le(header, nzix::TS))
    }

    fn link_type(&self, _packet: &PacketBuffer) -> LinkType {
        LinkType::Ethernet
    }

    fn capture_len(&self, _packet: &PacketBuffer) -> u32 {
        nzix::CAPTURE_LEN
    }

    fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        let header = self.expect_header(packet)?;
        Ok(read_u32_le(header, nzix::LEN))
    }

    fn timeval(&self, packet: &PacketBuffer) -> Option<Timeval> {
        self.record_header(packet)?;
        packet.timeval()
    }

    fn help(&self) -> String {
        format!(
            "{name} format module\n\
             Supported input URIs:\n\
             \t{name}:/path/to/YYYYMMDD-HHMMSS-file\n\
             \t{name}:-\t(stdin)\n\
             \n\
             \tThe file name must contain the trace start time (NZ local time).\n\
             \te.g.: {name}:/tmp/20000607-142312.nzix\n",
            name = self.name()
        )
    }
}

/// Move the frame bytes that follow the on-disk padding back over it, so
/// the padding ends up at the tail of the framing header.
fn realign(record: &mut [u8]) {
    let start = nzix::PAD;
    record.copy_within(start..start + nzix::SHIFTED_LEN, start + nzix::PAD_LEN);
}
