//! Integration tests for decoding legacy trace records.
//!
//! These tests verify that:
//! - Every format assembles whole records across short reads
//! - NZIX timing markers are skipped and padding is realigned
//! - NZIX timestamps are reconstructed across counter wraps
//! - Source failures and malformed fields surface as errors

use std::io::{self, Cursor, Read};

use legacytrace::legacy::{
    BuiltinFormat, FormatState, LegacyTrace, LinkType, PacketBuffer, PacketData, PacketReader,
    RecordFormat, RecordType, Timeval,
};
use legacytrace::{Error, TraceError};
use tempfile::tempdir;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Reader that returns at most `chunk` bytes per call.
struct Dribble {
    inner: Cursor<Vec<u8>>,
    chunk: usize,
}

impl Dribble {
    fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            inner: Cursor::new(data),
            chunk,
        }
    }
}

impl Read for Dribble {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..n])
    }
}

/// Reader that fails once after `fail_at` bytes, then carries on.
struct FailOnce {
    inner: Cursor<Vec<u8>>,
    fail_at: u64,
    failed: bool,
}

impl Read for FailOnce {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.failed && self.inner.position() >= self.fail_at {
            self.failed = true;
            return Err(io::Error::new(io::ErrorKind::Other, "device gone"));
        }
        let room = if self.failed {
            buf.len()
        } else {
            buf.len().min((self.fail_at - self.inner.position()) as usize)
        };
        self.inner.read(&mut buf[..room])
    }
}

fn eth_record(ts: u64, wlen: u16, fill: u8) -> Vec<u8> {
    let mut record = vec![fill; 64];
    record[..8].copy_from_slice(&ts.to_le_bytes());
    record[8..10].copy_from_slice(&wlen.to_le_bytes());
    record
}

fn pos_record(wlen: u32, first: [u8; 2]) -> Vec<u8> {
    let mut record = vec![0u8; 64];
    record[..8].copy_from_slice(&(7u64 << 32).to_le_bytes());
    record[12..16].copy_from_slice(&wlen.to_be_bytes());
    record[16..18].copy_from_slice(&first);
    record
}

fn atm_record(fill: u8) -> Vec<u8> {
    vec![fill; 64]
}

/// NZIX record whose frame bytes (from offset 12) count up from 12.
fn nzix_record(counter: u32, len: u32) -> Vec<u8> {
    let mut record: Vec<u8> = (0..68u8).collect();
    record[..4].copy_from_slice(&(counter << 2).to_le_bytes());
    record[4..8].copy_from_slice(&0u32.to_le_bytes());
    record[8..12].copy_from_slice(&len.to_le_bytes());
    record
}

const NZIX_URI: &str = "legacynzix:/traces/nzix-20030101-120000.gz";
const NZIX_EPOCH: i64 = 1_041_375_600;

fn trace_over(format: &str, uri: &str, data: Vec<u8>, chunk: usize) -> LegacyTrace<Dribble> {
    LegacyTrace::from_source_named(format, uri, Dribble::new(data, chunk)).unwrap()
}

#[test]
fn test_short_reads_assemble_whole_records() {
    init_logging();
    let cases: Vec<(&str, Vec<u8>, Vec<u8>, &str)> = vec![
        ("legacyeth", eth_record(1, 60, 0xa1), eth_record(2, 70, 0xa2), "eth"),
        ("legacypos", pos_record(40, [0xff, 0x03]), pos_record(41, [0x0f, 0x00]), "pos"),
        ("legacyatm", atm_record(0xb1), atm_record(0xb2), "atm"),
        ("legacynzix", nzix_record(10, 60), nzix_record(20, 61), NZIX_URI),
    ];

    for (format, first, second, uri) in cases {
        for chunk in [1, 7, 63, 64, 200] {
            let mut data = first.clone();
            data.extend_from_slice(&second);
            let mut trace = trace_over(format, uri, data, chunk);
            let record_len = trace.format().record_len();

            let mut packet = PacketBuffer::new();
            assert_eq!(trace.read_packet(&mut packet).unwrap(), Some(record_len));
            assert_eq!(packet.buffer().len(), record_len, "{format} chunk {chunk}");
            assert_eq!(packet.record_type(), Some(trace.format().record_type()));
            assert_eq!(trace.read_packet(&mut packet).unwrap(), Some(record_len));
            assert_eq!(trace.read_packet(&mut packet).unwrap(), None);
            assert!(packet.is_empty());
            assert_eq!(trace.frame_count(), 2);
        }
    }
}

#[test]
fn test_truncated_trailing_record_is_not_returned() {
    init_logging();
    let mut data = eth_record(1, 60, 0x11);
    data.extend_from_slice(&eth_record(2, 60, 0x22)[..30]);

    let mut trace = trace_over("legacyeth", "eth.trace", data, 16);
    let mut packet = PacketBuffer::new();
    assert!(trace.read_packet(&mut packet).unwrap().is_some());
    assert_eq!(trace.read_packet(&mut packet).unwrap(), None);
    assert_eq!(trace.frame_count(), 1);
}

#[test]
fn test_empty_source_is_end_of_input() {
    for format in BuiltinFormat::ALL {
        let uri = if format.record_type() == RecordType::LegacyNzix {
            NZIX_URI
        } else {
            "empty"
        };
        let source = Cursor::new(Vec::<u8>::new());
        let mut trace = LegacyTrace::from_source(format, uri, source).unwrap();
        let mut packet = PacketBuffer::new();
        assert_eq!(trace.read_packet(&mut packet).unwrap(), None);
    }
}

#[test]
fn test_accessors_after_end_of_input() {
    let cases = [
        ("legacyeth", eth_record(1, 60, 0x11), "eth.trace"),
        ("legacypos", pos_record(40, [0xff, 0x03]), "pos.trace"),
        ("legacyatm", atm_record(0x22), "atm.trace"),
        ("legacynzix", nzix_record(10, 60), NZIX_URI),
    ];

    for (format, record, uri) in cases {
        let mut trace = trace_over(format, uri, record, 64);
        let mut packet = PacketBuffer::new();
        assert!(trace.read_packet(&mut packet).unwrap().is_some());
        assert_eq!(trace.read_packet(&mut packet).unwrap(), None);

        assert!(matches!(
            trace.wire_len(&packet),
            Err(TraceError::RecordMismatch { found: None, .. })
        ));
        assert_eq!(trace.erf_timestamp(&packet), None, "{format}");
        assert_eq!(trace.timeval(&packet), None, "{format}");
        assert_eq!(trace.capture_time(&packet), None, "{format}");
    }
}

#[test]
fn test_accessors_reject_packet_from_other_trace() {
    let mut atm = trace_over("legacyatm", "atm.trace", atm_record(0x33), 64);
    let pos = trace_over("legacypos", "pos.trace", Vec::new(), 64);
    let mut packet = PacketBuffer::new();
    atm.read_packet(&mut packet).unwrap();

    match pos.wire_len(&packet) {
        Err(TraceError::RecordMismatch { format, found }) => {
            assert_eq!(format, "legacypos");
            assert_eq!(found, Some(RecordType::LegacyAtm));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(pos.erf_timestamp(&packet), None);
    assert_eq!(atm.wire_len(&packet).unwrap(), 53);
}

#[test]
fn test_source_error_carries_context_and_trace_survives() {
    let mut data = eth_record(1, 60, 0x11);
    data.extend_from_slice(&eth_record(2, 61, 0x22));
    let source = FailOnce {
        inner: Cursor::new(data),
        fail_at: 20,
        failed: false,
    };
    let mut trace = LegacyTrace::from_source_named("legacyeth", "eth.trace", source).unwrap();
    let mut packet = PacketBuffer::new();

    match trace.read_packet(&mut packet).unwrap_err() {
        TraceError::SourceRead { uri, operation, .. } => {
            assert_eq!(uri, "eth.trace");
            assert_eq!(operation, "read");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(packet.is_empty());

    // The source resumes after the bytes it already delivered
    assert_eq!(trace.read_packet(&mut packet).unwrap(), Some(64));
    assert_eq!(trace.read_packet(&mut packet).unwrap(), None);
}

#[test]
fn test_ethernet_accessors() {
    let mut trace = trace_over("legacyeth", "eth.trace", eth_record(9 << 32, 1514, 0x5a), 64);
    let mut packet = PacketBuffer::new();
    trace.read_packet(&mut packet).unwrap();

    assert_eq!(trace.link_type(&packet), LinkType::Ethernet);
    assert_eq!(trace.wire_len(&packet).unwrap(), 1514);
    assert_eq!(trace.capture_len(&packet), 64);
    assert_eq!(trace.framing_len(), 10);
    assert_eq!(trace.erf_timestamp(&packet), Some(9 << 32));
    assert_eq!(trace.timeval(&packet), None);
    assert_eq!(trace.capture_time(&packet), Some(Timeval { tv_sec: 9, tv_usec: 0 }));
    assert!(packet.payload().iter().all(|&b| b == 0x5a));
}

#[test]
fn test_pos_link_type_and_wire_length() {
    let mut data = pos_record(40, [0x0f, 0x00]);
    data.extend_from_slice(&pos_record(0, [0xff, 0x03]));
    let mut trace = trace_over("legacypos", "pos.trace", data, 64);
    let mut packet = PacketBuffer::new();

    trace.read_packet(&mut packet).unwrap();
    assert_eq!(trace.link_type(&packet), LinkType::HdlcPos);
    assert_eq!(trace.wire_len(&packet).unwrap(), 40);

    trace.read_packet(&mut packet).unwrap();
    assert_eq!(trace.link_type(&packet), LinkType::Ppp);
    assert!(matches!(
        trace.wire_len(&packet),
        Err(TraceError::MalformedRecord { format: "legacypos", .. })
    ));
}

#[test]
fn test_pos_zero_wire_length_fails_packet_reader() {
    let mut data = pos_record(0, [0xff, 0x03]);
    data.extend_from_slice(&pos_record(52, [0xff, 0x03]));
    let mut trace = trace_over("legacypos", "pos.trace", data, 64);

    assert!(matches!(
        trace.next_packet(),
        Err(Error::Trace(TraceError::MalformedRecord { .. }))
    ));
    let packet = trace.next_packet().unwrap().unwrap();
    assert_eq!(packet.original_len, 52);
    assert_eq!(packet.frame_number, 2);
}

#[test]
fn test_atm_wire_length_is_constant() {
    let data: Vec<u8> = [0x00u8, 0x42, 0xff].iter().flat_map(|&b| atm_record(b)).collect();
    let trace = trace_over("legacyatm", "atm.trace", data, 64);

    let packets: Vec<_> = trace.collect::<Result<_, _>>().unwrap();
    assert_eq!(packets.len(), 3);
    for packet in packets {
        assert_eq!(packet.original_len, 53);
        assert_eq!(packet.link_type, LinkType::Atm);
        assert_eq!(packet.data.len(), 52);
    }
}

#[test]
fn test_nzix_zero_length_records_skipped() {
    init_logging();
    let mut data = Vec::new();
    for _ in 0..5 {
        data.extend_from_slice(&nzix_record(1, 0));
    }
    data.extend_from_slice(&nzix_record(1_000, 60));

    let trace = trace_over("legacynzix", NZIX_URI, data, 68);
    let packets: Vec<_> = trace.collect::<Result<_, _>>().unwrap();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].original_len, 60);
    assert_eq!(packets[0].frame_number, 1);
}

#[test]
fn test_nzix_payload_realigned() {
    let mut trace = trace_over("legacynzix", NZIX_URI, nzix_record(5, 60), 13);
    let mut packet = PacketBuffer::new();
    trace.read_packet(&mut packet).unwrap();

    assert_eq!(packet.header().len(), 14);
    assert_eq!(packet.payload().len(), 54);
    assert_eq!(trace.capture_len(&packet), 54);
    assert_eq!(trace.link_type(&packet), LinkType::Ethernet);
    assert_eq!(trace.erf_timestamp(&packet), None);

    let expected: Vec<u8> = (12..38u8).chain(40..68u8).collect();
    assert_eq!(packet.payload(), &expected[..]);
}

#[test]
fn test_nzix_timestamps_across_wrap() {
    let counters = [100u32, 500_000_000, 900_000_000, (1 << 30) - 10, 5, 1_000_000];
    let data: Vec<u8> = counters.iter().flat_map(|&c| nzix_record(c, 60)).collect();
    let mut trace = trace_over("legacynzix", NZIX_URI, data, 68);
    assert_eq!(trace.state().start_epoch(), Some(NZIX_EPOCH));

    let mut packet = PacketBuffer::new();
    let mut times = Vec::new();
    while trace.read_packet(&mut packet).unwrap().is_some() {
        times.push(trace.timeval(&packet).unwrap());
    }

    assert_eq!(times.len(), counters.len());
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    assert_eq!(times[0], Timeval { tv_sec: NZIX_EPOCH, tv_usec: 100 });

    let wrapped = (1u64 << 30) + 5;
    assert_eq!(
        times[4],
        Timeval {
            tv_sec: NZIX_EPOCH + (wrapped / 1_000_000) as i64,
            tv_usec: (wrapped % 1_000_000) as u32,
        }
    );
}

#[test]
fn test_nzix_requires_start_time_in_name() {
    let source = Cursor::new(Vec::<u8>::new());
    let result = LegacyTrace::from_source_named("legacynzix", "/traces/nzix.gz", source);
    assert!(matches!(result, Err(TraceError::EpochParse { .. })));
}

#[test]
fn test_unknown_format_name() {
    let source = Cursor::new(Vec::<u8>::new());
    let result = LegacyTrace::from_source_named("legacyfddi", "x", source);
    assert!(matches!(result, Err(TraceError::UnknownFormat { name }) if name == "legacyfddi"));
}

#[test]
fn test_external_buffer_replaced_by_owned_on_read() {
    let format = BuiltinFormat::by_name("legacyeth").unwrap();
    let external = bytes::Bytes::from(eth_record(3, 99, 0x77));

    let mut packet = PacketBuffer::new();
    format
        .prepare_packet(&mut packet, PacketData::External(external.clone()), RecordType::LegacyEth)
        .unwrap();
    assert!(packet.is_external());
    assert_eq!(format.wire_len(&packet).unwrap(), 99);

    let mut trace = trace_over("legacyeth", "eth.trace", eth_record(4, 100, 0x88), 64);
    trace.read_packet(&mut packet).unwrap();
    assert!(!packet.is_external());
    assert_eq!(trace.wire_len(&packet).unwrap(), 100);

    // Caller's buffer untouched
    assert_eq!(&external[..], &eth_record(3, 99, 0x77)[..]);
}

#[test]
fn test_read_after_state_close() {
    let format = BuiltinFormat::by_name("legacyatm").unwrap();
    let mut state = FormatState::new(&format, "atm.trace", Cursor::new(atm_record(1))).unwrap();
    state.close().unwrap();
    assert!(!state.is_open());

    let mut packet = PacketBuffer::new();
    assert!(matches!(
        format.read_packet(&mut state, &mut packet),
        Err(TraceError::SourceClosed { .. })
    ));
}

#[test]
fn test_open_nzix_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nzix-20030101-120000.trace");
    let mut data = nzix_record(0, 0);
    data.extend_from_slice(&nzix_record(2_000_001, 64));
    std::fs::write(&path, data).unwrap();

    let mut trace = LegacyTrace::open("legacynzix", &path).unwrap();
    let packet = trace.next_packet().unwrap().unwrap();
    assert_eq!(packet.timestamp_us, (NZIX_EPOCH + 2) * 1_000_000 + 1);
    assert_eq!(packet.original_len, 64);
    assert_eq!(packet.captured_len, 54);
    assert!(trace.next_packet().unwrap().is_none());
    trace.close().unwrap();
}

#[test]
fn test_open_missing_file() {
    let dir = tempdir().unwrap();
    let result = LegacyTrace::open("legacyeth", dir.path().join("absent.trace"));
    assert!(matches!(
        result,
        Err(Error::Trace(TraceError::SourceRead { operation: "open", .. }))
    ));
}

#[test]
fn test_read_batch() {
    let data: Vec<u8> = (0..5u8).flat_map(|i| eth_record(i as u64, 60, i)).collect();
    let mut trace = trace_over("legacyeth", "eth.trace", data, 64);

    let mut batch = Vec::new();
    assert_eq!(trace.read_batch(&mut batch, 3).unwrap(), 3);
    assert_eq!(batch[2].frame_number, 3);
    assert_eq!(trace.read_batch(&mut batch, 3).unwrap(), 2);
    assert_eq!(trace.read_batch(&mut batch, 3).unwrap(), 0);
}
