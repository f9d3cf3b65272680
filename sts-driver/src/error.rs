//! Driver error type

use core::fmt;

use sts_hal::TransportError;
use sts_protocol::{ErrorCode, FrameError};

/// Errors surfaced by the driver facade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// The serial link failed
    Transport(TransportError),
    /// The request could not be encoded
    Frame(FrameError),
    /// No response within the allotted time
    Timeout,
    /// A response arrived but was rejected by the assembler
    Response(ErrorCode),
    /// The device answered with a non-zero error number
    Device(u16),
}

impl From<TransportError> for DriverError {
    fn from(err: TransportError) -> Self {
        DriverError::Transport(err)
    }
}

impl From<FrameError> for DriverError {
    fn from(err: FrameError) -> Self {
        DriverError::Frame(err)
    }
}

impl From<ErrorCode> for DriverError {
    fn from(code: ErrorCode) -> Self {
        DriverError::Response(code)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Transport(err) => write!(f, "transport: {}", err),
            DriverError::Frame(err) => write!(f, "encode: {}", err),
            DriverError::Timeout => f.write_str("timed out waiting for response"),
            DriverError::Response(code) => write!(f, "response rejected: {}", code),
            DriverError::Device(errno) => write!(f, "device error number {}", errno),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}
