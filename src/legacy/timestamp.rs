//! Capture-time reconstruction for NZIX traces.
//!
//! NZIX records carry a 30-bit microsecond counter (stored shifted left by
//! two bits) instead of an absolute time. The absolute time is recovered by
//! anchoring the counter to the trace's start time, which is encoded in the
//! trace's file name, and by counting counter wraparounds across records.

use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Pacific::Auckland;
use regex::Regex;

use super::packet::Timeval;
use crate::error::TraceError;

/// Pattern of the start time embedded in NZIX trace names.
const START_TIME_PATTERN: &str = "[0-9]{8}-[0-9]{6}";

/// `chrono` format of the matched start time.
const START_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Significant bits of the on-disk counter.
const COUNTER_BITS: u32 = 30;

/// One full counter cycle.
const COUNTER_CYCLE: u64 = 1 << COUNTER_BITS;

/// Extract the start time from a trace name such as `nzix-20000607-142312.gz`.
///
/// The time is local to New Zealand, where the traces were captured. An
/// ambiguous local time resolves to the earlier instant.
pub fn parse_start_epoch(uri: &str) -> Result<i64, TraceError> {
    let epoch_err = |reason: String| TraceError::EpochParse {
        uri: uri.to_string(),
        reason,
    };

    let pattern =
        Regex::new(START_TIME_PATTERN).map_err(|e| epoch_err(format!("bad pattern: {e}")))?;
    let found = pattern
        .find(uri)
        .ok_or_else(|| epoch_err("no YYYYMMDD-HHMMSS start time in name".to_string()))?;

    let naive = NaiveDateTime::parse_from_str(found.as_str(), START_TIME_FORMAT)
        .map_err(|e| epoch_err(format!("invalid start time {}: {e}", found.as_str())))?;

    match Auckland.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
        LocalResult::None => Err(epoch_err(format!(
            "start time {} does not exist in Pacific/Auckland",
            found.as_str()
        ))),
    }
}

/// Magnitude of the difference between two counters, scaled to the 32-bit domain.
fn counter_distance(a: u32, b: u32) -> u32 {
    let a = a << 2;
    let b = b << 2;
    a.abs_diff(b)
}

/// Running state that extends the truncated counter into a full clock.
///
/// Updates must be applied in record order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampReconstructor {
    start_epoch: i64,
    /// Accumulated microseconds since `start_epoch`.
    ts_high: u64,
    /// Counter value of the previous record.
    ts_old: u32,
}

impl TimestampReconstructor {
    /// Start a clock at `start_epoch` (seconds since the Unix epoch).
    pub fn new(start_epoch: i64) -> Self {
        Self {
            start_epoch,
            ts_high: 0,
            ts_old: 0,
        }
    }

    /// Start a clock from the start time embedded in `uri`.
    pub fn from_uri(uri: &str) -> Result<Self, TraceError> {
        parse_start_epoch(uri).map(Self::new)
    }

    pub fn start_epoch(&self) -> i64 {
        self.start_epoch
    }

    /// Microseconds accumulated so far.
    pub fn elapsed_micros(&self) -> u64 {
        self.ts_high
    }

    /// Fold in the raw header timestamp of the next record and return its capture time.
    pub fn update(&mut self, raw_ts: u32) -> Timeval {
        let counter = raw_ts >> 2;
        let mut ts = self.ts_high;

        if counter_distance(counter, self.ts_old) > u32::MAX / 2 {
            ts += COUNTER_CYCLE;
            tracing::trace!(counter, previous = self.ts_old, "NZIX counter wrapped");
        }
        ts &= !(COUNTER_CYCLE - 1);
        ts += counter as u64;

        self.ts_old = counter;
        self.ts_high = ts;

        Timeval {
            tv_sec: self.start_epoch + (ts / 1_000_000) as i64,
            tv_usec: (ts % 1_000_000) as u32,
        }
    }
}
