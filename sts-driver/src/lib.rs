//! STS spectrometer serial driver
//!
//! Ties the packet engine in `sts-protocol` to a byte transport from
//! `sts-hal`:
//!
//! - [`Sts`] - driver facade: send commands, read responses
//! - [`ReadScheduler`] - non-blocking, bounded, and unbounded read loops
//! - [`DriverConfig`] - serial and timing settings
//!
//! The engine is single-threaded and cooperative. Nothing runs in the
//! background; every byte is consumed inside a read call made by the
//! application's own loop, and the only waiting happens inside the blocking
//! read variants.
//!
//! # Example
//!
//! ```ignore
//! let mut sts = Sts::new(uart, timer);
//! sts.begin()?;
//! sts.set_integration_time(100_000)?;
//!
//! let response = sts.request(Command::GetTemperature)?;
//! let raw = response.payload();
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

pub mod config;
pub mod driver;
pub mod error;
pub mod scheduler;

pub use config::{ConfigError, DriverConfig};
pub use driver::Sts;
pub use error::DriverError;
pub use scheduler::{ReadScheduler, ReadStatus};

// Re-export the protocol types callers need alongside the driver
pub use sts_protocol::{ChecksumType, Command, ErrorCode, MessageType, Request, Response};
