//! Read scheduling
//!
//! Moves bytes from a [`ByteTransport`] into a [`ResponseAssembler`] under
//! three policies:
//!
//! - [`ReadScheduler::poll`] drains what is available right now and returns
//! - [`ReadScheduler::read_timeout`] keeps polling, sleeping between polls,
//!   until a response completes, a frame fails, or the timeout elapses
//! - [`ReadScheduler::read_until_available`] is the same loop without a
//!   bound. If the device never answers it never returns.
//!
//! Each entry point starts a new read cycle, which discards a response that
//! was already complete or failed. Read it out first.

use embedded_hal::delay::DelayNs;
use sts_hal::{ByteTransport, Clock, TransportError};
use sts_protocol::{ChecksumPolicy, ErrorCode, ResponseAssembler, Step};

use crate::config::DEFAULT_POLL_INTERVAL_US;

/// Where a read cycle stands after a pass over the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadStatus {
    /// Transport drained, no complete frame yet
    Pending,
    /// A validated response is available
    Available,
    /// The frame in progress was rejected
    Failed(ErrorCode),
}

/// Drives the assembler from a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadScheduler {
    poll_interval_us: u32,
}

impl Default for ReadScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL_US)
    }
}

impl ReadScheduler {
    /// Create a scheduler that waits `poll_interval_us` between empty polls
    pub fn new(poll_interval_us: u32) -> Self {
        Self {
            poll_interval_us: poll_interval_us.max(1),
        }
    }

    pub fn poll_interval_us(&self) -> u32 {
        self.poll_interval_us
    }

    /// Non-blocking read
    ///
    /// Consumes bytes until the transport is empty, a response completes,
    /// or the frame fails. Never waits.
    pub fn poll<T, P>(
        &self,
        transport: &mut T,
        assembler: &mut ResponseAssembler<P>,
    ) -> Result<ReadStatus, TransportError>
    where
        T: ByteTransport,
        P: ChecksumPolicy,
    {
        assembler.begin_cycle();
        drain(transport, assembler, || false)
    }

    /// Blocking read bounded by `timeout_ms`
    ///
    /// Returns `Ok(true)` iff a response became available in time. The
    /// deadline is also checked between bytes, so a link that never goes
    /// quiet cannot hold the read past `timeout_ms`.
    pub fn read_timeout<T, K, P>(
        &self,
        transport: &mut T,
        timer: &mut K,
        assembler: &mut ResponseAssembler<P>,
        timeout_ms: u32,
    ) -> Result<bool, TransportError>
    where
        T: ByteTransport,
        K: Clock + DelayNs,
        P: ChecksumPolicy,
    {
        assembler.begin_cycle();
        let start = timer.now_ms();
        let timeout = timeout_ms as u64;

        loop {
            let expired = || timer.now_ms().saturating_sub(start) >= timeout;
            match drain(transport, assembler, expired)? {
                ReadStatus::Available => return Ok(true),
                ReadStatus::Failed(_) => return Ok(false),
                ReadStatus::Pending => {}
            }

            if timer.now_ms().saturating_sub(start) >= timeout {
                debug!("read timed out after {} ms", timeout_ms);
                return Ok(false);
            }
            timer.delay_us(self.poll_interval_us);
        }
    }

    /// Blocking read with no bound
    ///
    /// Returns `Ok(true)` on a validated response and `Ok(false)` when the
    /// frame was rejected. Blocks forever if no frame ever arrives; prefer
    /// [`ReadScheduler::read_timeout`].
    pub fn read_until_available<T, K, P>(
        &self,
        transport: &mut T,
        timer: &mut K,
        assembler: &mut ResponseAssembler<P>,
    ) -> Result<bool, TransportError>
    where
        T: ByteTransport,
        K: DelayNs,
        P: ChecksumPolicy,
    {
        assembler.begin_cycle();

        loop {
            match drain(transport, assembler, || false)? {
                ReadStatus::Available => return Ok(true),
                ReadStatus::Failed(_) => return Ok(false),
                ReadStatus::Pending => timer.delay_us(self.poll_interval_us),
            }
        }
    }
}

/// One pass: feed every available byte, stopping early on a result
///
/// `expired` is asked after every byte that leaves the frame undecided; a
/// `true` ends the pass as [`ReadStatus::Pending`] even if bytes remain.
fn drain<T, P, E>(
    transport: &mut T,
    assembler: &mut ResponseAssembler<P>,
    mut expired: E,
) -> Result<ReadStatus, TransportError>
where
    T: ByteTransport,
    P: ChecksumPolicy,
    E: FnMut() -> bool,
{
    while transport.available() > 0 {
        let byte = transport.read_byte()?;
        match assembler.consume(byte) {
            Step::Continue => {
                if expired() {
                    trace!("deadline reached with bytes still arriving");
                    return Ok(ReadStatus::Pending);
                }
            }
            Step::Complete => {
                let response = assembler.response();
                debug!(
                    "response type {:?} regarding {:?} with {:?} payload bytes",
                    response.message_type(),
                    response.regarding_id(),
                    response.payload_length()
                );
                return Ok(ReadStatus::Available);
            }
            Step::Error(code) => {
                warn!("frame rejected: {:?}", code);
                return Ok(ReadStatus::Failed(code));
            }
        }
    }

    trace!("transport drained, in frame: {:?}", assembler.in_frame());
    Ok(ReadStatus::Pending)
}
