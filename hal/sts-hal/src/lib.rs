//! STS Hardware Abstraction Layer
//!
//! This crate defines the byte-level serial contract the STS packet engine
//! is written against, plus the timing contract the blocking read entry
//! points need. Chip or OS specific serial ports implement these traits;
//! the protocol and driver crates never see a concrete peripheral.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  sts-driver (scheduler + facade)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  sts-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//! ┌─────────────┐ ┌─────────┐ ┌─────────┐
//! │ embedded-io │ │ StdTimer│ │  Mock   │
//! │  UARTs      │ │ (host)  │ │ (tests) │
//! └─────────────┘ └─────────┘ └─────────┘
//! ```
//!
//! # Traits
//!
//! - [`transport::ByteTransport`] - Byte-at-a-time serial channel
//! - [`clock::Clock`] - Monotonic millisecond clock
//!
//! Waiting between polls uses [`embedded_hal::delay::DelayNs`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod clock;
#[cfg(feature = "embedded-io")]
pub mod io;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdTimer;
pub use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded-io")]
pub use io::IoTransport;
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockTimer, MockTransport};
pub use transport::{ByteTransport, DataBits, Parity, SerialConfig, StopBits, TransportError};
