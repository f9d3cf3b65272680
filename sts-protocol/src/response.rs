//! Decoded response frame
//!
//! One [`Response`] lives inside the assembler and is reused for every read
//! cycle. The payload is a view into its fixed buffer and is overwritten by
//! the next frame, so callers copy out what they need before reading again.

use core::fmt;

use crate::checksum::{ChecksumType, Digest, CHECKSUM_SIZE};
use crate::frame::MAX_FRAME_DATA_SIZE;
use crate::messages::MessageType;

/// Outcome of assembling one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    #[default]
    None,
    /// Payload digest did not match the declared checksum
    ChecksumFailure,
    /// Declared payload larger than [`MAX_FRAME_DATA_SIZE`]
    PacketExceedsByteArrayLength,
    /// Second header byte was not `0xC0`
    UnexpectedStartByte,
    /// Footer mismatch, unknown checksum type, or a length field shorter
    /// than the checksum it must contain
    MalformedFrame,
}

// Wire format values, as reported by `to_u8`
const NO_ERROR: u8 = 0;
const CHECKSUM_FAILURE: u8 = 1;
const PACKET_EXCEEDS_BYTE_ARRAY_LENGTH: u8 = 2;
const UNEXPECTED_START_BYTE: u8 = 3;
const MALFORMED_FRAME: u8 = 4;

impl ErrorCode {
    pub fn to_u8(self) -> u8 {
        match self {
            ErrorCode::None => NO_ERROR,
            ErrorCode::ChecksumFailure => CHECKSUM_FAILURE,
            ErrorCode::PacketExceedsByteArrayLength => PACKET_EXCEEDS_BYTE_ARRAY_LENGTH,
            ErrorCode::UnexpectedStartByte => UNEXPECTED_START_BYTE,
            ErrorCode::MalformedFrame => MALFORMED_FRAME,
        }
    }

    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            NO_ERROR => Some(ErrorCode::None),
            CHECKSUM_FAILURE => Some(ErrorCode::ChecksumFailure),
            PACKET_EXCEEDS_BYTE_ARRAY_LENGTH => Some(ErrorCode::PacketExceedsByteArrayLength),
            UNEXPECTED_START_BYTE => Some(ErrorCode::UnexpectedStartByte),
            MALFORMED_FRAME => Some(ErrorCode::MalformedFrame),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        self != ErrorCode::None
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::None => "no error",
            ErrorCode::ChecksumFailure => "checksum failure",
            ErrorCode::PacketExceedsByteArrayLength => "packet exceeds payload buffer",
            ErrorCode::UnexpectedStartByte => "unexpected start byte",
            ErrorCode::MalformedFrame => "malformed frame",
        };
        f.write_str(text)
    }
}

/// A response frame, complete or in progress
#[derive(Clone)]
pub struct Response {
    pub(crate) protocol_version: u16,
    pub(crate) flags: u16,
    pub(crate) error_number: u16,
    pub(crate) message_type: u32,
    pub(crate) regarding_id: u32,
    pub(crate) checksum_type: u8,
    pub(crate) checksum: Digest,
    pub(crate) payload_length: u32,
    pub(crate) frame_data: [u8; MAX_FRAME_DATA_SIZE],
    pub(crate) available: bool,
    pub(crate) error_code: ErrorCode,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub const fn new() -> Self {
        Self {
            protocol_version: 0,
            flags: 0,
            error_number: 0,
            message_type: 0,
            regarding_id: 0,
            checksum_type: 0,
            checksum: [0; CHECKSUM_SIZE],
            payload_length: 0,
            frame_data: [0; MAX_FRAME_DATA_SIZE],
            available: false,
            error_code: ErrorCode::None,
        }
    }

    /// Clear every field back to its default
    ///
    /// The payload buffer is zeroed only up to the previous payload length;
    /// bytes past it were never exposed.
    pub fn reset(&mut self) {
        let used = (self.payload_length as usize).min(MAX_FRAME_DATA_SIZE);
        self.frame_data[..used].fill(0);
        self.protocol_version = 0;
        self.flags = 0;
        self.error_number = 0;
        self.message_type = 0;
        self.regarding_id = 0;
        self.checksum_type = 0;
        self.checksum = [0; CHECKSUM_SIZE];
        self.payload_length = 0;
        self.available = false;
        self.error_code = ErrorCode::None;
    }

    pub fn protocol_version(&self) -> u16 {
        self.protocol_version
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Error number reported by the device (0 on success)
    pub fn error_number(&self) -> u16 {
        self.error_number
    }

    pub fn message_type(&self) -> u32 {
        self.message_type
    }

    /// The message type as a known command, if it is one
    pub fn known_message_type(&self) -> Option<MessageType> {
        MessageType::from_u32(self.message_type)
    }

    pub fn regarding_id(&self) -> u32 {
        self.regarding_id
    }

    /// Raw checksum type byte
    pub fn checksum_type(&self) -> u8 {
        self.checksum_type
    }

    /// Checksum type byte decoded, if recognised
    pub fn checksum_kind(&self) -> Option<ChecksumType> {
        ChecksumType::from_byte(self.checksum_type)
    }

    /// Received digest; all zero when the frame carried none
    pub fn checksum(&self) -> &Digest {
        &self.checksum
    }

    /// Payload length derived from the bytes-remaining field
    pub fn payload_length(&self) -> u32 {
        self.payload_length
    }

    /// Payload bytes of this frame
    pub fn payload(&self) -> &[u8] {
        let len = (self.payload_length as usize).min(MAX_FRAME_DATA_SIZE);
        &self.frame_data[..len]
    }

    /// Total frame length on the wire
    pub fn packet_length(&self) -> usize {
        crate::frame::HEADER_SIZE
            + self.payload_length as usize
            + ChecksumType::from_byte(self.checksum_type).map_or(0, ChecksumType::len)
            + crate::frame::FOOTER_SIZE
    }

    /// True once a full frame has been received and validated
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_error(&self) -> bool {
        self.error_code.is_error()
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    /// Complete, either validated or failed
    pub fn is_finished(&self) -> bool {
        self.available || self.is_error()
    }

    pub(crate) fn fail(&mut self, code: ErrorCode) {
        self.available = false;
        self.error_code = code;
    }

    pub(crate) fn complete(&mut self) {
        self.available = true;
        self.error_code = ErrorCode::None;
    }

    #[cfg(test)]
    pub(crate) fn frame_data(&self) -> &[u8; MAX_FRAME_DATA_SIZE] {
        &self.frame_data
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("protocol_version", &self.protocol_version)
            .field("flags", &self.flags)
            .field("error_number", &self.error_number)
            .field("message_type", &self.message_type)
            .field("regarding_id", &self.regarding_id)
            .field("checksum_type", &self.checksum_type)
            .field("payload_length", &self.payload_length)
            .field("available", &self.available)
            .field("error_code", &self.error_code)
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Response {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Response {{ type: {=u32:#x}, regarding: {=u32}, len: {=u32}, available: {=bool}, error: {} }}",
            self.message_type,
            self.regarding_id,
            self.payload_length,
            self.available,
            self.error_code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::None.to_u8(), 0);
        assert_eq!(ErrorCode::ChecksumFailure.to_u8(), 1);
        assert_eq!(ErrorCode::PacketExceedsByteArrayLength.to_u8(), 2);
        assert_eq!(ErrorCode::UnexpectedStartByte.to_u8(), 3);
        assert_eq!(ErrorCode::MalformedFrame.to_u8(), 4);
        assert_eq!(ErrorCode::from_u8(3), Some(ErrorCode::UnexpectedStartByte));
        assert_eq!(ErrorCode::from_u8(9), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut response = Response::new();
        response.message_type = 0x0040_0001;
        response.regarding_id = 7;
        response.error_number = 2;
        response.payload_length = 3;
        response.frame_data[..3].copy_from_slice(&[1, 2, 3]);
        response.checksum = [0xFF; CHECKSUM_SIZE];
        response.complete();

        response.reset();

        assert!(!response.is_available());
        assert!(!response.is_error());
        assert_eq!(response.message_type(), 0);
        assert_eq!(response.regarding_id(), 0);
        assert_eq!(response.error_number(), 0);
        assert_eq!(response.checksum(), &[0; CHECKSUM_SIZE]);
        assert!(response.payload().is_empty());
        assert_eq!(&response.frame_data()[..3], &[0, 0, 0]);
    }

    #[test]
    fn test_available_and_error_are_exclusive() {
        let mut response = Response::new();
        response.complete();
        response.fail(ErrorCode::ChecksumFailure);
        assert!(!response.is_available());
        assert!(response.is_error());

        response.complete();
        assert!(response.is_available());
        assert!(!response.is_error());
    }

    #[test]
    fn test_packet_length() {
        let mut response = Response::new();
        response.payload_length = 10;
        response.checksum_type = 1;
        assert_eq!(response.packet_length(), 21 + 10 + 16 + 4);
    }
}
