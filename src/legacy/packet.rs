//! Decoded packet representation.

use bytes::Bytes;

use super::layout::RecordType;

/// Capture time with microsecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timeval {
    pub tv_sec: i64,
    pub tv_usec: u32,
}

impl Timeval {
    /// Convert a 64-bit ERF timestamp (seconds in the upper 32 bits,
    /// binary fraction of a second in the lower 32).
    pub fn from_erf(ts: u64) -> Self {
        let tv_sec = (ts >> 32) as i64;
        let tv_usec = (((ts & 0xffff_ffff) * 1_000_000) >> 32) as u32;
        Self { tv_sec, tv_usec }
    }

    /// Microseconds since the Unix epoch.
    pub fn as_micros(&self) -> i64 {
        self.tv_sec * 1_000_000 + self.tv_usec as i64
    }
}

/// Storage behind a [`PacketBuffer`].
#[derive(Debug, Clone)]
pub enum PacketData {
    /// Allocated by the decoder and reused across reads.
    Owned(Vec<u8>),
    /// Supplied by the caller; never recycled by the decoder.
    External(Bytes),
}

impl PacketData {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            PacketData::Owned(v) => v,
            PacketData::External(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// One decoded record: raw bytes split into a framing header and a payload.
///
/// The payload view always starts where the header view ends. A buffer that
/// is reused across reads keeps its allocation between records.
#[derive(Debug, Clone, Default)]
pub struct PacketBuffer {
    data: Option<PacketData>,
    record_type: Option<RecordType>,
    framing_len: usize,
    timeval: Option<Timeval>,
}

impl PacketBuffer {
    /// Create an empty packet buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Format tag of the record currently held, if any.
    pub fn record_type(&self) -> Option<RecordType> {
        self.record_type
    }

    /// Whether a record is currently held.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Whether the held buffer was supplied by the caller.
    pub fn is_external(&self) -> bool {
        matches!(self.data, Some(PacketData::External(_)))
    }

    /// The whole record.
    pub fn buffer(&self) -> &[u8] {
        match &self.data {
            Some(data) => data.as_slice(),
            None => &[],
        }
    }

    /// Framing header view.
    pub fn header(&self) -> &[u8] {
        &self.buffer()[..self.framing_len]
    }

    /// Payload view, starting right after the framing header.
    pub fn payload(&self) -> &[u8] {
        &self.buffer()[self.framing_len..]
    }

    /// Length of the framing header.
    pub fn framing_len(&self) -> usize {
        self.framing_len
    }

    /// Capture time reconstructed while decoding, for formats that keep a clock.
    pub fn timeval(&self) -> Option<Timeval> {
        self.timeval
    }

    /// Payload as shared bytes, consuming the packet.
    pub fn into_payload(self) -> Bytes {
        let framing_len = self.framing_len;
        match self.data {
            Some(PacketData::Owned(v)) => Bytes::from(v).slice(framing_len..),
            Some(PacketData::External(b)) => b.slice(framing_len..),
            None => Bytes::new(),
        }
    }

    /// Install `data` as the active record, releasing whatever was held before.
    ///
    /// `framing_len` must not exceed `data.len()`.
    pub(crate) fn install(&mut self, data: PacketData, record_type: RecordType, framing_len: usize) {
        debug_assert!(framing_len <= data.len());
        self.data = Some(data);
        self.record_type = Some(record_type);
        self.framing_len = framing_len;
        self.timeval = None;
    }

    pub(crate) fn set_timeval(&mut self, timeval: Timeval) {
        self.timeval = Some(timeval);
    }

    /// Hand the owned allocation to the decoder for the next read, or a new
    /// one if the current buffer is external. The packet is left empty.
    pub(crate) fn take_owned_buffer(&mut self, capacity: usize) -> Vec<u8> {
        let buffer = match self.data.take() {
            Some(PacketData::Owned(v)) => v,
            _ => Vec::with_capacity(capacity),
        };
        self.record_type = None;
        self.framing_len = 0;
        self.timeval = None;
        buffer
    }
}
