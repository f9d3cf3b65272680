//! Driver configuration
//!
//! Defaults match the spectrometer's factory serial settings. With the
//! `toml` feature the configuration can be loaded from text:
//!
//! ```toml
//! baud_rate = 115200
//! poll_interval_us = 500
//! read_timeout_ms = 2000
//! checksum = "md5"
//! ```

use core::fmt;

use sts_hal::SerialConfig;
use sts_protocol::{ChecksumType, PROTOCOL_VERSION};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default wait between transport polls in blocking reads
pub const DEFAULT_POLL_INTERVAL_US: u32 = 1_000;

/// Default bound for [`crate::Sts::request`]
pub const DEFAULT_READ_TIMEOUT_MS: u32 = 1_000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Baud rate of zero
    InvalidBaudRate,
    /// Poll interval of zero would spin without yielding
    InvalidPollInterval,
    /// Text could not be parsed
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaudRate => f.write_str("baud rate must be non-zero"),
            ConfigError::InvalidPollInterval => f.write_str("poll interval must be non-zero"),
            ConfigError::Parse => f.write_str("invalid configuration text"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DriverConfig {
    /// Serial baud rate passed to the transport on `begin`
    pub baud_rate: u32,
    /// Wait between polls in the blocking read loops
    pub poll_interval_us: u32,
    /// Bound used by `request`
    pub read_timeout_ms: u32,
    /// Checksum attached to outgoing requests
    pub checksum: ChecksumType,
    /// Protocol version written into outgoing requests
    pub protocol_version: u16,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            checksum: ChecksumType::None,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        if self.poll_interval_us == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        Ok(())
    }

    /// Line settings for the transport
    pub fn serial(&self) -> SerialConfig {
        SerialConfig::with_baud(self.baud_rate)
    }

    /// Parse and validate a TOML document
    ///
    /// Missing keys keep their defaults.
    #[cfg(feature = "toml")]
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }
}
