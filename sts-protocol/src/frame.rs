//! Frame encoding for outgoing requests.
//!
//! Frame format:
//! - HEADER (2 bytes): 0xC1 0xC0
//! - PROTOCOL VERSION (2 bytes)
//! - FLAGS (2 bytes)
//! - ERROR NUMBER (2 bytes): always 0 in requests
//! - MESSAGE TYPE (4 bytes)
//! - REGARDING ID (4 bytes)
//! - CHECKSUM TYPE (1 byte): 0 none, 1 MD5
//! - BYTES REMAINING (4 bytes): payload length + checksum length
//! - PAYLOAD (0-2500 bytes)
//! - CHECKSUM (0 or 16 bytes): digest of PAYLOAD
//! - FOOTER (4 bytes): 0xC2 0xC3 0xC4 0xC5

use core::fmt;

use heapless::Vec;

use crate::checksum::{Checksum, ChecksumPolicy, ChecksumType, CHECKSUM_SIZE};
use crate::messages::MessageType;

/// First header byte
pub const START_BYTE_1: u8 = 0xC1;

/// Second header byte
pub const START_BYTE_2: u8 = 0xC0;

/// Frame terminator
pub const FOOTER: [u8; FOOTER_SIZE] = [0xC2, 0xC3, 0xC4, 0xC5];

/// Protocol version spoken by this driver
pub const PROTOCOL_VERSION: u16 = 0x1000;

/// Maximum payload size in bytes
pub const MAX_FRAME_DATA_SIZE: usize = 2500;

/// Bytes from the first header byte through the bytes-remaining field
pub const HEADER_SIZE: usize = 2 + 2 + 2 + 2 + 4 + 4 + 1 + 4;

/// Footer length
pub const FOOTER_SIZE: usize = 4;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_FRAME_DATA_SIZE + CHECKSUM_SIZE + FOOTER_SIZE;

/// Errors that can occur while encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds [`MAX_FRAME_DATA_SIZE`]
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::PayloadTooLarge => write!(f, "payload exceeds {} bytes", MAX_FRAME_DATA_SIZE),
            FrameError::BufferTooSmall => f.write_str("encode buffer too small"),
        }
    }
}

/// An outgoing command
///
/// The payload is borrowed; its length is only checked when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request<'a> {
    /// Protocol version field
    pub protocol_version: u16,
    /// Flags field
    pub flags: u16,
    /// Command identifier
    pub message_type: u32,
    /// Correlates with an earlier exchange, 0 if none
    pub regarding_id: u32,
    /// Whether a digest follows the payload
    pub checksum_type: ChecksumType,
    /// Command-specific data
    pub payload: &'a [u8],
}

impl<'a> Request<'a> {
    /// Create a request with no payload and no checksum
    pub fn new(message_type: u32) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            flags: 0,
            message_type,
            regarding_id: 0,
            checksum_type: ChecksumType::None,
            payload: &[],
        }
    }

    /// Create a request for a known command identifier
    pub fn for_message(message_type: MessageType) -> Self {
        Self::new(message_type.to_u32())
    }

    pub fn with_payload(mut self, payload: &'a [u8]) -> Self {
        self.payload = payload;
        self
    }

    pub fn regarding(mut self, regarding_id: u32) -> Self {
        self.regarding_id = regarding_id;
        self
    }

    pub fn with_checksum(mut self, checksum_type: ChecksumType) -> Self {
        self.checksum_type = checksum_type;
        self
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_protocol_version(mut self, protocol_version: u16) -> Self {
        self.protocol_version = protocol_version;
        self
    }

    /// Value of the bytes-remaining field
    pub fn bytes_remaining(&self) -> u32 {
        (self.payload.len() + self.checksum_type.len()) as u32
    }

    /// Total encoded size
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + self.checksum_type.len() + FOOTER_SIZE
    }

    /// Encode this request into a byte buffer
    ///
    /// Returns the number of bytes written. Nothing is written on error.
    pub fn encode<P: ChecksumPolicy>(
        &self,
        policy: &P,
        buffer: &mut [u8],
    ) -> Result<usize, FrameError> {
        if self.payload.len() > MAX_FRAME_DATA_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let checksum = Checksum::compute(policy, self.checksum_type, self.payload);

        let mut pos = 0;
        let mut put = |bytes: &[u8]| {
            buffer[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };
        put(&[START_BYTE_1, START_BYTE_2]);
        put(&self.protocol_version.to_be_bytes());
        put(&self.flags.to_be_bytes());
        put(&0u16.to_be_bytes());
        put(&self.message_type.to_be_bytes());
        put(&self.regarding_id.to_be_bytes());
        put(&[self.checksum_type.to_byte()]);
        put(&self.bytes_remaining().to_be_bytes());
        put(self.payload);
        put(checksum.as_bytes());
        put(&FOOTER);

        Ok(frame_len)
    }

    /// Encode this request into a heapless Vec
    pub fn encode_to_vec<P: ChecksumPolicy>(
        &self,
        policy: &P,
    ) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut vec = Vec::new();
        vec.resize_default(self.encoded_len().min(MAX_FRAME_SIZE))
            .map_err(|_| FrameError::BufferTooSmall)?;
        let len = self.encode(policy, &mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }
}
