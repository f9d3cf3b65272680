//! STS Spectrometer Serial Protocol
//!
//! This crate defines the binary framing used to command an STS spectrometer
//! over a serial link and to decode its replies. It owns the wire layout,
//! the checksum policy, and the byte-at-a-time response state machine.
//! It performs no I/O; the driver crate moves bytes between a transport and
//! the types defined here.
//!
//! # Frame Format
//!
//! Every frame, in both directions, has the same layout. All multi-byte
//! integers are big-endian.
//! ```text
//! ┌────────┬─────────┬───────┬───────┬──────────┬───────────┬──────┬───────────┬─────────┬──────────┬────────┐
//! │ HEADER │ VERSION │ FLAGS │ ERRNO │ MSG TYPE │ REGARDING │ CSUM │ REMAINING │ PAYLOAD │ CHECKSUM │ FOOTER │
//! │ C1 C0  │ 2B      │ 2B    │ 2B    │ 4B       │ 4B        │ 1B   │ 4B        │ 0-2500B │ 0 or 16B │ C2..C5 │
//! └────────┴─────────┴───────┴───────┴──────────┴───────────┴──────┴───────────┴─────────┴──────────┴────────┘
//! ```
//!
//! REMAINING counts the payload plus the checksum bytes.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod assembler;
pub mod checksum;
pub mod frame;
pub mod messages;
pub mod response;

pub use assembler::{ResponseAssembler, Step};
pub use checksum::{Checksum, ChecksumPolicy, ChecksumType, Digest, Md5Checksum, CHECKSUM_SIZE};
pub use frame::{
    FrameError, Request, FOOTER, FOOTER_SIZE, HEADER_SIZE, MAX_FRAME_DATA_SIZE, MAX_FRAME_SIZE,
    PROTOCOL_VERSION, START_BYTE_1, START_BYTE_2,
};
pub use messages::{Command, MessageType};
pub use response::{ErrorCode, Response};
