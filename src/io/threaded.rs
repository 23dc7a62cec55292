//! Asynchronous buffered writer.
//!
//! [`ThreadedWriter`] hands output to a dedicated consumer thread through a
//! fixed pool of byte buffers ("slots"), so the producer returns as soon as its
//! bytes are copied instead of waiting on the sink.
//!
//! ## Protocol
//!
//! Every slot is either `Empty` (owned by the producer) or `Full` (owned by
//! the consumer). The producer fills slots in index order; a slot becomes
//! `Full` only once it holds exactly `buffer_size` bytes. The consumer drains
//! `Full` slots in the same order, so bytes reach the sink in write order and
//! in `buffer_size` chunks.
//!
//! A producer whose next slot is still `Full` waits on `space_avail`; a
//! consumer whose next slot is `Empty` waits on `data_ready` until close is
//! requested, at which point it drains what is already `Full` and exits.
//!
//! ## Trailing bytes
//!
//! By default a final, partially filled slot is discarded on close, matching
//! the established output of this writer. Set
//! [`WriterConfig::flush_partial_on_close`] to drain it as well.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::sink::{create_file_sink, ByteSink};
use crate::error::{Error, WriterError};

/// Default number of slots in the pool.
pub const DEFAULT_BUFFERS: usize = 100;

/// Default slot capacity (1MB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Pool dimensions and close behaviour for a [`ThreadedWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// Number of slots, fixed for the writer's lifetime.
    pub buffers: usize,
    /// Capacity of each slot in bytes.
    pub buffer_size: usize,
    /// Drain a partially filled final slot on close instead of dropping it.
    pub flush_partial_on_close: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            buffers: DEFAULT_BUFFERS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_partial_on_close: false,
        }
    }
}

impl WriterConfig {
    /// Set the number of slots.
    pub fn with_buffers(mut self, buffers: usize) -> Self {
        self.buffers = buffers;
        self
    }

    /// Set the capacity of each slot.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Choose whether close drains a partially filled final slot.
    pub fn with_flush_partial_on_close(mut self, flush: bool) -> Self {
        self.flush_partial_on_close = flush;
        self
    }

    /// Check that the pool can hold data at all.
    pub fn validate(&self) -> Result<(), WriterError> {
        if self.buffers == 0 {
            return Err(WriterError::InvalidConfig {
                reason: "buffer pool must have at least one slot".to_string(),
            });
        }
        if self.buffer_size == 0 {
            return Err(WriterError::InvalidConfig {
                reason: "slot capacity must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Empty,
    Full,
}

struct Slot {
    /// Backing storage; moved out by the consumer while it writes.
    data: Box<[u8]>,
    len: usize,
    state: SlotState,
}

impl Slot {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            state: SlotState::Empty,
        }
    }
}

struct Pool {
    slots: Vec<Slot>,
    /// Slot the producer is filling.
    out_slot: usize,
    /// Producer's fill position within `out_slot`.
    offset: usize,
    closing: bool,
    consumer_done: bool,
}

impl Pool {
    fn mark_full(&mut self, shared: &Shared) {
        let count = self.slots.len();
        self.slots[self.out_slot].state = SlotState::Full;
        shared.data_ready.notify_one();
        self.offset = 0;
        self.out_slot = (self.out_slot + 1) % count;
    }
}

struct Shared {
    pool: Mutex<Pool>,
    /// A slot became Full (producer to consumer).
    data_ready: Condvar,
    /// A slot became Empty (consumer to producer).
    space_avail: Condvar,
    buffer_size: usize,
}

/// Writer that drains output to a [`ByteSink`] on a background thread.
///
/// Data is accepted through [`std::io::Write`]. Call [`close`](Self::close)
/// to wait for the consumer and observe drain failures; dropping the writer
/// closes it too but discards the outcome.
pub struct ThreadedWriter {
    shared: Arc<Shared>,
    consumer: Option<JoinHandle<Result<(), WriterError>>>,
    flush_partial_on_close: bool,
}

impl ThreadedWriter {
    /// Start a writer draining into `sink`.
    pub fn new<S: ByteSink>(sink: S, config: WriterConfig) -> Result<Self, WriterError> {
        config.validate()?;

        let slots = (0..config.buffers)
            .map(|_| Slot::new(config.buffer_size))
            .collect();
        let shared = Arc::new(Shared {
            pool: Mutex::new(Pool {
                slots,
                out_slot: 0,
                offset: 0,
                closing: false,
                consumer_done: false,
            }),
            data_ready: Condvar::new(),
            space_avail: Condvar::new(),
            buffer_size: config.buffer_size,
        });

        let consumer_shared = Arc::clone(&shared);
        let consumer = thread::Builder::new()
            .name("legacytrace-writer".to_string())
            .spawn(move || run_consumer(&consumer_shared, sink))
            .map_err(WriterError::Spawn)?;

        tracing::debug!(
            buffers = config.buffers,
            buffer_size = config.buffer_size,
            "Started writer thread"
        );

        Ok(Self {
            shared,
            consumer: Some(consumer),
            flush_partial_on_close: config.flush_partial_on_close,
        })
    }

    /// Start a writer draining into the file at `path` (`-` for stdout).
    pub fn create<P: AsRef<Path>>(path: P, config: WriterConfig) -> Result<Self, Error> {
        let sink = create_file_sink(path)?;
        Ok(Self::new(sink, config)?)
    }

    /// Stop the consumer after it has drained every Full slot, then close the sink.
    ///
    /// Returns the first sink failure the consumer ran into, if any.
    pub fn close(mut self) -> Result<(), WriterError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), WriterError> {
        let Some(consumer) = self.consumer.take() else {
            return Ok(());
        };

        {
            let mut pool = self.shared.pool.lock();
            if pool.offset > 0 {
                if self.flush_partial_on_close {
                    pool.mark_full(&self.shared);
                } else {
                    tracing::debug!(bytes = pool.offset, "Discarding partial buffer on close");
                }
            }
            pool.closing = true;
            self.shared.data_ready.notify_one();
        }

        match consumer.join() {
            Ok(result) => result,
            Err(_) => Err(WriterError::ConsumerPanicked),
        }
    }
}

impl Write for ThreadedWriter {
    /// Copy `buf` into the pool, waiting while the target slot is Full.
    ///
    /// Returns fewer bytes than requested only if the consumer has stopped.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let shared = &*self.shared;
        let mut pool = shared.pool.lock();
        let mut remaining = buf;
        let mut copied = 0;

        while !remaining.is_empty() {
            while pool.slots[pool.out_slot].state == SlotState::Full && !pool.consumer_done {
                shared.space_avail.wait(&mut pool);
            }
            if pool.consumer_done {
                break;
            }

            let slice = {
                let pool = &mut *pool;
                let slot = &mut pool.slots[pool.out_slot];
                let slice = (shared.buffer_size - pool.offset).min(remaining.len());
                slot.data[pool.offset..pool.offset + slice].copy_from_slice(&remaining[..slice]);
                slot.len += slice;
                pool.offset += slice;
                slice
            };

            remaining = &remaining[slice..];
            copied += slice;

            if pool.offset >= shared.buffer_size {
                pool.mark_full(shared);
            }
        }

        Ok(copied)
    }

    /// Does nothing. Only whole slots are drained, so a partially filled
    /// slot stays in the pool until more data arrives or the writer closes.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ThreadedWriter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Writer closed with error: {e}");
        }
    }
}

fn run_consumer<S: ByteSink>(shared: &Shared, mut sink: S) -> Result<(), WriterError> {
    let mut index = 0;
    let mut drain_error: Option<io::Error> = None;
    let mut pool = shared.pool.lock();

    loop {
        while pool.slots[index].state == SlotState::Empty {
            if pool.closing {
                return finish(shared, pool, sink, drain_error);
            }
            shared.data_ready.wait(&mut pool);
        }

        let data = std::mem::take(&mut pool.slots[index].data);
        let len = pool.slots[index].len;

        MutexGuard::unlocked(&mut pool, || {
            if drain_error.is_some() {
                return;
            }
            if let Err(e) = sink.write_chunk(&data[..len]) {
                tracing::error!("Write thread failed to drain buffer: {e}");
                drain_error = Some(e);
            }
        });

        let slot = &mut pool.slots[index];
        slot.data = data;
        slot.len = 0;
        slot.state = SlotState::Empty;
        shared.space_avail.notify_one();

        index = (index + 1) % pool.slots.len();

        if len == 0 {
            return finish(shared, pool, sink, drain_error);
        }
    }
}

fn finish<S: ByteSink>(
    shared: &Shared,
    mut pool: MutexGuard<'_, Pool>,
    mut sink: S,
    drain_error: Option<io::Error>,
) -> Result<(), WriterError> {
    pool.consumer_done = true;
    shared.space_avail.notify_all();
    drop(pool);

    tracing::debug!("Write thread leaving");

    let closed = sink.close();
    match drain_error {
        Some(e) => Err(WriterError::Drain(e)),
        None => closed.map_err(WriterError::Sink),
    }
}
