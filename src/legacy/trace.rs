//! Reading packets from an open legacy trace.

use std::path::Path;

use bytes::Bytes;

use super::layout::LinkType;
use super::packet::{PacketBuffer, PacketData, Timeval};
use super::registry::{BuiltinFormat, RecordAction, RecordFormat};
use super::timestamp::TimestampReconstructor;
use crate::error::{Error, TraceError};
use crate::io::{open_file_source, ByteSource, FileSource};

/// Per-trace decode state: the byte source plus any clock the format keeps.
pub struct FormatState<S> {
    uri: String,
    source: Option<S>,
    clock: Option<TimestampReconstructor>,
}

impl<S: ByteSource> FormatState<S> {
    /// Set up state for reading `source` as `format`.
    pub fn new<F: RecordFormat + ?Sized>(
        format: &F,
        uri: impl Into<String>,
        source: S,
    ) -> Result<Self, TraceError> {
        let uri = uri.into();
        let clock = format.start_clock(&uri)?;
        Ok(Self {
            uri,
            source: Some(source),
            clock,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Start time of the trace clock, for formats that keep one.
    pub fn start_epoch(&self) -> Option<i64> {
        self.clock.as_ref().map(TimestampReconstructor::start_epoch)
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// Release the byte source. Later reads fail with `SourceClosed`.
    pub fn close(&mut self) -> Result<(), TraceError> {
        match self.source.take() {
            Some(mut source) => source.close().map_err(|e| TraceError::SourceRead {
                uri: self.uri.clone(),
                operation: "close",
                source: e,
            }),
            None => Ok(()),
        }
    }

    /// Fill `buf` completely. Returns `false` at end of input.
    fn fill_record(&mut self, buf: &mut [u8]) -> Result<bool, TraceError> {
        let uri = &self.uri;
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| TraceError::SourceClosed { uri: uri.clone() })?;

        let mut filled = 0;
        while filled < buf.len() {
            let n = source
                .read(&mut buf[filled..])
                .map_err(|e| TraceError::SourceRead {
                    uri: uri.clone(),
                    operation: "read",
                    source: e,
                })?;
            if n == 0 {
                if filled > 0 {
                    tracing::warn!(
                        uri = %uri,
                        have = filled,
                        expected = buf.len(),
                        "Discarding truncated record at end of trace"
                    );
                }
                return Ok(false);
            }
            filled += n;
            if filled < buf.len() {
                tracing::trace!(have = filled, expected = buf.len(), "Short read, retrying");
            }
        }
        Ok(true)
    }
}

/// Shared read loop of every legacy format.
///
/// Reads exactly one record, applies the format's fix-ups (skipping records
/// it rejects) and installs the result in `packet`, reusing its buffer when
/// the decoder owns it. On end of input or error the packet is left empty.
pub(crate) fn read_record<F, S>(
    format: &F,
    state: &mut FormatState<S>,
    packet: &mut PacketBuffer,
) -> Result<Option<usize>, TraceError>
where
    F: RecordFormat + ?Sized,
    S: ByteSource,
{
    let record_len = format.record_len();
    let mut buffer = packet.take_owned_buffer(record_len);
    buffer.resize(record_len, 0);

    loop {
        if !state.fill_record(&mut buffer)? {
            return Ok(None);
        }
        match format.fixup_record(&mut buffer) {
            RecordAction::Keep => break,
            RecordAction::Skip => {
                tracing::trace!(format = format.name(), "Skipping timing record");
            }
        }
    }

    format.prepare_packet(packet, PacketData::Owned(buffer), format.record_type())?;

    if let Some(clock) = state.clock.as_mut() {
        if let Some(counter) = format.clock_counter(packet) {
            packet.set_timeval(clock.update(counter));
        }
    }

    Ok(Some(record_len))
}

/// An open legacy trace.
///
/// ```no_run
/// use legacytrace::legacy::{LegacyTrace, PacketBuffer};
///
/// let mut trace = LegacyTrace::open("legacypos", "/traces/pos.trace")?;
/// let mut packet = PacketBuffer::new();
/// while trace.read_packet(&mut packet)?.is_some() {
///     println!("{} {}", trace.link_type(&packet), trace.wire_len(&packet)?);
/// }
/// trace.close()?;
/// # Ok::<(), legacytrace::Error>(())
/// ```
pub struct LegacyTrace<S: ByteSource = FileSource> {
    format: BuiltinFormat,
    state: FormatState<S>,
    frame_number: u64,
}

impl LegacyTrace<FileSource> {
    /// Open the file at `path` (or stdin for `-`) as the named format.
    pub fn open<P: AsRef<Path>>(format_name: &str, path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let format = lookup(format_name)?;
        let uri = path.display().to_string();
        // Fail on a bad name before touching the file
        let clock = format.start_clock(&uri)?;
        let source = open_file_source(path)?;
        Ok(Self::with_state(
            format,
            FormatState {
                uri,
                source: Some(source),
                clock,
            },
        ))
    }
}

impl<S: ByteSource> LegacyTrace<S> {
    /// Read `source` as `format`. `uri` names the trace in errors and, for
    /// NZIX, carries the start time.
    pub fn from_source(
        format: BuiltinFormat,
        uri: impl Into<String>,
        source: S,
    ) -> Result<Self, TraceError> {
        let state = FormatState::new(&format, uri, source)?;
        Ok(Self::with_state(format, state))
    }

    /// Like [`from_source`](Self::from_source), selecting the format by name.
    pub fn from_source_named(
        format_name: &str,
        uri: impl Into<String>,
        source: S,
    ) -> Result<Self, TraceError> {
        Self::from_source(lookup(format_name)?, uri, source)
    }

    fn with_state(format: BuiltinFormat, state: FormatState<S>) -> Self {
        tracing::debug!(
            format = format.name(),
            uri = state.uri(),
            start_epoch = ?state.start_epoch(),
            "Opened legacy trace"
        );
        Self {
            format,
            state,
            frame_number: 0,
        }
    }

    pub fn format(&self) -> &BuiltinFormat {
        &self.format
    }

    pub fn state(&self) -> &FormatState<S> {
        &self.state
    }

    pub fn uri(&self) -> &str {
        self.state.uri()
    }

    /// Number of packets decoded so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Decode the next packet into `packet`.
    ///
    /// Returns the record size consumed, or `None` at end of input. Errors
    /// only affect this call; the trace stays usable.
    pub fn read_packet(&mut self, packet: &mut PacketBuffer) -> Result<Option<usize>, TraceError> {
        let read = self.format.read_packet(&mut self.state, packet)?;
        if read.is_some() {
            self.frame_number += 1;
        }
        Ok(read)
    }

    pub fn link_type(&self, packet: &PacketBuffer) -> LinkType {
        self.format.link_type(packet)
    }

    pub fn capture_len(&self, packet: &PacketBuffer) -> u32 {
        self.format.capture_len(packet)
    }

    pub fn wire_len(&self, packet: &PacketBuffer) -> Result<u32, TraceError> {
        self.format.wire_len(packet)
    }

    pub fn framing_len(&self) -> usize {
        self.format.framing_len()
    }

    pub fn erf_timestamp(&self, packet: &PacketBuffer) -> Option<u64> {
        self.format.erf_timestamp(packet)
    }

    pub fn timeval(&self, packet: &PacketBuffer) -> Option<Timeval> {
        self.format.timeval(packet)
    }

    /// Capture time from whichever timestamp the format provides.
    pub fn capture_time(&self, packet: &PacketBuffer) -> Option<Timeval> {
        self.timeval(packet)
            .or_else(|| self.erf_timestamp(packet).map(Timeval::from_erf))
    }

    /// Close the trace, releasing the byte source.
    pub fn close(mut self) -> Result<(), TraceError> {
        tracing::debug!(uri = self.state.uri(), frames = self.frame_number, "Closing legacy trace");
        self.state.close()
    }
}

fn lookup(format_name: &str) -> Result<BuiltinFormat, TraceError> {
    BuiltinFormat::by_name(format_name).ok_or_else(|| TraceError::UnknownFormat {
        name: format_name.to_string(),
    })
}

/// A decoded packet detached from its trace.
#[derive(Clone, Debug)]
pub struct RawPacket {
    /// Frame number (1-indexed)
    pub frame_number: u64,
    /// Timestamp in microseconds since Unix epoch
    pub timestamp_us: i64,
    /// Payload bytes present in `data`
    pub captured_len: u32,
    /// Packet length on the wire
    pub original_len: u32,
    /// Link layer of `data`
    pub link_type: LinkType,
    /// Payload, without the framing header
    pub data: Bytes,
}

/// Sequential reader of detached packets.
pub trait PacketReader {
    /// Read the next packet.
    ///
    /// Returns `Ok(None)` at end of input.
    fn next_packet(&mut self) -> Result<Option<RawPacket>, Error>;

    /// Number of packets read so far.
    fn frame_count(&self) -> u64;

    /// Read up to `max` packets into `buffer`, which is cleared first.
    ///
    /// Returns the number of packets read (0 means EOF).
    fn read_batch(&mut self, buffer: &mut Vec<RawPacket>, max: usize) -> Result<usize, Error> {
        buffer.clear();
        buffer.reserve(max);
        while buffer.len() < max {
            match self.next_packet()? {
                Some(pkt) => buffer.push(pkt),
                None => break,
            }
        }
        Ok(buffer.len())
    }
}

impl<S: ByteSource> PacketReader for LegacyTrace<S> {
    fn next_packet(&mut self) -> Result<Option<RawPacket>, Error> {
        let mut packet = PacketBuffer::new();
        if self.read_packet(&mut packet)?.is_none() {
            return Ok(None);
        }

        let link_type = self.link_type(&packet);
        let original_len = self.wire_len(&packet)?;
        let timestamp_us = self.capture_time(&packet).map_or(0, |tv| tv.as_micros());
        let data = packet.into_payload();

        Ok(Some(RawPacket {
            frame_number: self.frame_number,
            timestamp_us,
            captured_len: data.len() as u32,
            original_len,
            link_type,
            data,
        }))
    }

    fn frame_count(&self) -> u64 {
        self.frame_number
    }
}

/// Iterator adapter for LegacyTrace.
impl<S: ByteSource> Iterator for LegacyTrace<S> {
    type Item = Result<RawPacket, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}
