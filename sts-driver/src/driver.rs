//! Driver facade
//!
//! [`Sts`] owns the serial transport, the timer, and the single reused
//! response. Requests are encoded and written in one go; responses are read
//! through the scheduler policies and exposed by reference.

use embedded_hal::delay::DelayNs;
use sts_hal::{ByteTransport, Clock};
use sts_protocol::{
    ChecksumPolicy, Command, Md5Checksum, Request, Response, ResponseAssembler, MAX_FRAME_SIZE,
};

use crate::config::{ConfigError, DriverConfig};
use crate::error::DriverError;
use crate::scheduler::{ReadScheduler, ReadStatus};

/// STS spectrometer on a serial link
pub struct Sts<T, K, P = Md5Checksum> {
    transport: T,
    timer: K,
    assembler: ResponseAssembler<P>,
    scheduler: ReadScheduler,
    config: DriverConfig,
}

impl<T, K> Sts<T, K, Md5Checksum>
where
    T: ByteTransport,
    K: Clock + DelayNs,
{
    /// Create a driver with default settings
    pub fn new(transport: T, timer: K) -> Self {
        let config = DriverConfig::default();
        Self {
            transport,
            timer,
            assembler: ResponseAssembler::new(),
            scheduler: ReadScheduler::new(config.poll_interval_us),
            config,
        }
    }

    /// Create a driver with validated settings
    pub fn with_config(
        transport: T,
        timer: K,
        config: DriverConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_policy(transport, timer, config, Md5Checksum)
    }
}

impl<T, K, P> Sts<T, K, P>
where
    T: ByteTransport,
    K: Clock + DelayNs,
    P: ChecksumPolicy,
{
    /// Create a driver that computes and checks digests with `policy`
    pub fn with_policy(
        transport: T,
        timer: K,
        config: DriverConfig,
        policy: P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            timer,
            assembler: ResponseAssembler::with_policy(policy),
            scheduler: ReadScheduler::new(config.poll_interval_us),
            config,
        })
    }

    /// Open the serial link
    pub fn begin(&mut self) -> Result<(), DriverError> {
        info!("opening serial link at {} baud", self.config.baud_rate);
        self.transport.begin(&self.config.serial())?;
        Ok(())
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Encode a request and write it out
    ///
    /// Nothing reaches the transport if encoding fails.
    pub fn send(&mut self, request: &Request<'_>) -> Result<(), DriverError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = request.encode(self.assembler.policy(), &mut buffer)?;

        debug!(
            "sending type {:?} with {:?} payload bytes",
            request.message_type,
            request.payload.len()
        );
        self.transport.write_all(&buffer[..len])?;
        self.transport.flush()?;
        Ok(())
    }

    /// Send one of the known commands using the configured checksum and
    /// protocol version
    pub fn send_command(&mut self, command: Command) -> Result<(), DriverError> {
        let args = command.payload();
        let request = command
            .to_request(&args)
            .with_checksum(self.config.checksum)
            .with_protocol_version(self.config.protocol_version);
        self.send(&request)
    }

    /// Request one corrected spectrum
    pub fn ask_spectrum(&mut self) -> Result<(), DriverError> {
        self.send_command(Command::GetCorrectedSpectrum)
    }

    /// Set the integration time in microseconds
    pub fn set_integration_time(&mut self, integration_time_us: u32) -> Result<(), DriverError> {
        self.send_command(Command::SetIntegrationTime(integration_time_us))
    }

    /// Set how many scans are averaged per spectrum
    pub fn set_averaged_scans(&mut self, scans: u16) -> Result<(), DriverError> {
        self.send_command(Command::SetAveragedScans(scans))
    }

    /// Read whatever is available without waiting
    ///
    /// Resets a previously complete response first, so consume it before
    /// calling again.
    pub fn read_packet(&mut self) -> Result<ReadStatus, DriverError> {
        Ok(self.scheduler.poll(&mut self.transport, &mut self.assembler)?)
    }

    /// Wait up to `timeout_ms` for a response
    ///
    /// Returns `Ok(false)` on timeout or when the frame was rejected; check
    /// [`Response::error_code`] to tell them apart.
    pub fn read_packet_timeout(&mut self, timeout_ms: u32) -> Result<bool, DriverError> {
        Ok(self.scheduler.read_timeout(
            &mut self.transport,
            &mut self.timer,
            &mut self.assembler,
            timeout_ms,
        )?)
    }

    /// Wait for a response with no time limit
    ///
    /// Caution: if the device never answers this never returns. Prefer
    /// [`Sts::read_packet_timeout`].
    pub fn read_packet_until_available(&mut self) -> Result<bool, DriverError> {
        Ok(self.scheduler.read_until_available(
            &mut self.transport,
            &mut self.timer,
            &mut self.assembler,
        )?)
    }

    /// The current response
    ///
    /// Overwritten by the next read call.
    pub fn response(&self) -> &Response {
        self.assembler.response()
    }

    /// One request/response exchange
    ///
    /// Discards stale inbound bytes and any partial frame, sends `command`,
    /// and waits up to the configured read timeout. Not retried.
    pub fn request(&mut self, command: Command) -> Result<&Response, DriverError> {
        self.discard_inbound()?;
        self.send_command(command)?;

        if !self.read_packet_timeout(self.config.read_timeout_ms)? {
            let code = self.assembler.response().error_code();
            if code.is_error() {
                return Err(DriverError::Response(code));
            }
            debug!("no response to {:?}", command.message_type());
            return Err(DriverError::Timeout);
        }

        let response = self.assembler.response();
        if response.error_number() != 0 {
            return Err(DriverError::Device(response.error_number()));
        }
        Ok(response)
    }

    /// Give back the transport and timer
    pub fn release(self) -> (T, K) {
        (self.transport, self.timer)
    }

    fn discard_inbound(&mut self) -> Result<(), DriverError> {
        self.assembler.reset();
        let mut dropped = 0usize;
        while self.transport.available() > 0 {
            self.transport.read_byte()?;
            dropped += 1;
        }
        if dropped > 0 {
            trace!("discarded {} stale bytes", dropped);
        }
        Ok(())
    }
}
