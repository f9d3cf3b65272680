//! Scripted transport and virtual clock for host tests
//!
//! [`MockTransport`] plays back bytes queued with [`MockTransport::push_inbound`]
//! and records everything written to it. In trickle mode it hands out a
//! small batch, then reports nothing on the following poll, so a reader sees
//! the link the way a slow UART presents it: a few bytes, a gap, a few more.
//!
//! [`MockTimer`] is a clock that only moves when someone delays on it, which
//! makes timeout tests deterministic.

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

use crate::clock::Clock;
use crate::transport::{ByteTransport, SerialConfig, TransportError};

/// Capacity of the inbound and outbound mock buffers
pub const MOCK_BUFFER_SIZE: usize = 8192;

/// In-memory serial link
#[derive(Debug, Default)]
pub struct MockTransport {
    pending: Deque<u8, MOCK_BUFFER_SIZE>,
    ready: usize,
    trickle: Option<usize>,
    gap: bool,
    written: Vec<u8, MOCK_BUFFER_SIZE>,
    reply: Vec<u8, MOCK_BUFFER_SIZE>,
    flushes: usize,
    config: Option<SerialConfig>,
    disconnected: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver at most `batch` bytes per poll, with an empty poll in between
    pub fn with_trickle(batch: usize) -> Self {
        Self {
            trickle: Some(batch.max(1)),
            ..Self::default()
        }
    }

    /// Queue bytes as if the device had sent them
    ///
    /// Bytes beyond the mock capacity are dropped.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.pending.push_back(byte).is_err() {
                break;
            }
        }
    }

    /// Queue bytes that arrive once the next write is flushed
    ///
    /// Models a device that answers only after it has received a request.
    pub fn reply_on_flush(&mut self, bytes: &[u8]) {
        self.reply.clear();
        let _ = self.reply.extend_from_slice(bytes);
    }

    /// Inbound bytes not yet read, delivered or not
    pub fn pending_inbound(&self) -> usize {
        self.pending.len()
    }

    /// Everything written so far
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Number of `flush` calls
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Line settings passed to the last `begin`
    pub fn config(&self) -> Option<SerialConfig> {
        self.config
    }

    /// Make every write fail with [`TransportError::Disconnected`]
    pub fn set_disconnected(&mut self, disconnected: bool) {
        self.disconnected = disconnected;
    }
}

impl ByteTransport for MockTransport {
    fn begin(&mut self, config: &SerialConfig) -> Result<(), TransportError> {
        self.config = Some(*config);
        Ok(())
    }

    fn available(&mut self) -> usize {
        match self.trickle {
            None => self.ready = self.pending.len(),
            Some(batch) => {
                if self.ready == 0 {
                    if self.gap {
                        self.gap = false;
                        return 0;
                    }
                    self.ready = batch.min(self.pending.len());
                    self.gap = self.ready > 0;
                }
            }
        }
        self.ready
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        if self.ready == 0 {
            return Err(TransportError::Underflow);
        }
        self.ready -= 1;
        self.pending.pop_front().ok_or(TransportError::Underflow)
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        if self.disconnected {
            return Err(TransportError::Disconnected);
        }
        self.written.push(byte).map_err(|_| TransportError::Write)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        if self.disconnected {
            return Err(TransportError::Disconnected);
        }
        self.flushes += 1;
        let reply = core::mem::take(&mut self.reply);
        self.push_inbound(&reply);
        Ok(())
    }
}

/// Virtual clock advanced only by delays
#[derive(Debug, Default, Clone, Copy)]
pub struct MockTimer {
    now_ns: u64,
    delays: usize,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without counting a delay
    pub fn advance_ms(&mut self, ms: u64) {
        self.now_ns += ms * 1_000_000;
    }

    /// Number of delay calls observed
    pub fn delays(&self) -> usize {
        self.delays
    }
}

impl Clock for MockTimer {
    fn now_ms(&self) -> u64 {
        self.now_ns / 1_000_000
    }
}

impl DelayNs for MockTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns += ns as u64;
        self.delays += 1;
    }
}
