//! Serial byte transport abstraction
//!
//! The packet engine consumes the link one byte at a time and never assumes
//! anything about buffering below it. A transport only has to report how
//! many bytes are ready, hand them out in arrival order, and accept bytes
//! for transmission.

use core::fmt;

/// Errors a transport can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// `read_byte` called while nothing was available
    Underflow,
    /// A byte could not be queued for transmission
    Write,
    /// Underlying peripheral or OS error
    Io,
    /// The link is gone
    Disconnected,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Underflow => f.write_str("read with no byte available"),
            TransportError::Write => f.write_str("transmit failed"),
            TransportError::Io => f.write_str("serial I/O error"),
            TransportError::Disconnected => f.write_str("serial link disconnected"),
        }
    }
}

/// Byte-oriented serial channel
///
/// `available` and `read_byte` are non-blocking: the read scheduler only
/// calls `read_byte` after `available` reported at least one byte.
pub trait ByteTransport {
    /// Open the link with the given line settings
    ///
    /// Transports that are configured elsewhere (a pre-opened port, a
    /// peripheral set up at boot) can keep the default no-op.
    fn begin(&mut self, config: &SerialConfig) -> Result<(), TransportError> {
        let _ = config;
        Ok(())
    }

    /// Number of received bytes ready to be read without blocking
    fn available(&mut self) -> usize;

    /// Take the oldest received byte
    ///
    /// Returns [`TransportError::Underflow`] when nothing is available.
    fn read_byte(&mut self) -> Result<u8, TransportError>;

    /// Queue one byte for transmission
    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError>;

    /// Queue a run of bytes for transmission, in order
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Block until everything queued has left the transmitter
    fn flush(&mut self) -> Result<(), TransportError>;
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn begin(&mut self, config: &SerialConfig) -> Result<(), TransportError> {
        (**self).begin(config)
    }

    fn available(&mut self) -> usize {
        (**self).available()
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        (**self).write_byte(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}

/// Serial line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl SerialConfig {
    /// 8N1 at the given baud rate
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
