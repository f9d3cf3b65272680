//! Incremental response decoding.
//!
//! [`ResponseAssembler`] consumes the link one byte at a time and fills in
//! the [`Response`] it owns. Fields arrive in wire order and each state only
//! advances once its field has all of its bytes, so a frame can be spread
//! over any number of calls.
//!
//! Errors end the current frame only. The next byte is treated as header
//! search again, so a corrupted frame never leaves the assembler stuck.

use crate::checksum::{self, ChecksumPolicy, ChecksumType, Md5Checksum, CHECKSUM_SIZE};
use crate::frame::{FOOTER, FOOTER_SIZE, MAX_FRAME_DATA_SIZE, START_BYTE_1, START_BYTE_2};
use crate::response::{ErrorCode, Response};

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// More bytes are needed
    Continue,
    /// A full frame was received and validated
    Complete,
    /// The current frame was rejected
    Error(ErrorCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Discarding bytes until 0xC1
    AwaitHeader1,
    /// Got 0xC1, expecting 0xC0
    AwaitHeader2,
    ProtocolVersion,
    Flags,
    ErrorNumber,
    MessageType,
    RegardingId,
    ChecksumType,
    /// Bytes-remaining field
    Length,
    Payload,
    Checksum,
    Footer,
    /// Frame validated; nothing consumed until reset
    Complete,
    /// Frame rejected; header search resumes on the next byte
    Errored,
}

/// Byte-at-a-time response state machine
pub struct ResponseAssembler<P = Md5Checksum> {
    state: State,
    /// Big-endian accumulator for the integer field being read
    field: u32,
    /// Bytes consumed in the current field, payload or checksum
    cursor: usize,
    response: Response,
    policy: P,
}

impl Default for ResponseAssembler<Md5Checksum> {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseAssembler<Md5Checksum> {
    /// Create an assembler validating checksums with MD5
    pub fn new() -> Self {
        Self::with_policy(Md5Checksum)
    }
}

impl<P: ChecksumPolicy> ResponseAssembler<P> {
    /// Create an assembler with a custom checksum policy
    pub fn with_policy(policy: P) -> Self {
        Self {
            state: State::AwaitHeader1,
            field: 0,
            cursor: 0,
            response: Response::new(),
            policy,
        }
    }

    /// The response being assembled
    ///
    /// Only meaningful once [`Response::is_available`] is true.
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Clear the response and restart header search
    pub fn reset(&mut self) {
        self.response.reset();
        self.state = State::AwaitHeader1;
        self.field = 0;
        self.cursor = 0;
    }

    /// Prepare for a new read cycle
    ///
    /// A finished response (complete or failed) is discarded. A frame that
    /// is still arriving is kept so reading can resume where it stopped.
    pub fn begin_cycle(&mut self) {
        if self.response.is_finished() {
            self.response.reset();
            if self.state == State::Complete {
                self.state = State::AwaitHeader1;
            }
        }
    }

    /// True while a frame has started but not finished
    pub fn in_frame(&self) -> bool {
        !matches!(
            self.state,
            State::AwaitHeader1 | State::Complete | State::Errored
        )
    }

    /// Feed one received byte
    pub fn consume(&mut self, byte: u8) -> Step {
        match self.state {
            State::AwaitHeader1 => self.on_header_1(byte),
            State::AwaitHeader2 => self.on_header_2(byte),
            State::ProtocolVersion => self.on_u16(byte, State::Flags, |r, v| {
                r.protocol_version = v;
            }),
            State::Flags => self.on_u16(byte, State::ErrorNumber, |r, v| r.flags = v),
            State::ErrorNumber => self.on_u16(byte, State::MessageType, |r, v| {
                r.error_number = v;
            }),
            State::MessageType => self.on_u32(byte, State::RegardingId, |r, v| {
                r.message_type = v;
            }),
            State::RegardingId => self.on_u32(byte, State::ChecksumType, |r, v| {
                r.regarding_id = v;
            }),
            State::ChecksumType => self.on_checksum_type(byte),
            State::Length => self.on_length(byte),
            State::Payload => self.on_payload(byte),
            State::Checksum => self.on_checksum(byte),
            State::Footer => self.on_footer(byte),
            State::Complete => Step::Complete,
            State::Errored => {
                self.state = State::AwaitHeader1;
                self.on_header_1(byte)
            }
        }
    }

    fn on_header_1(&mut self, byte: u8) -> Step {
        if byte == START_BYTE_1 {
            self.state = State::AwaitHeader2;
        }
        // Anything else is line noise between frames
        Step::Continue
    }

    fn on_header_2(&mut self, byte: u8) -> Step {
        if byte == START_BYTE_2 {
            self.response.reset();
            self.begin_field(State::ProtocolVersion);
            return Step::Continue;
        }

        self.response.fail(ErrorCode::UnexpectedStartByte);
        if byte == START_BYTE_1 {
            // The stray byte was noise; this one may open the real frame
            self.state = State::AwaitHeader2;
            Step::Error(ErrorCode::UnexpectedStartByte)
        } else {
            self.fail(ErrorCode::UnexpectedStartByte)
        }
    }

    fn on_u16(&mut self, byte: u8, next: State, store: fn(&mut Response, u16)) -> Step {
        if let Some(value) = self.accumulate(byte, 2) {
            store(&mut self.response, value as u16);
            self.begin_field(next);
        }
        Step::Continue
    }

    fn on_u32(&mut self, byte: u8, next: State, store: fn(&mut Response, u32)) -> Step {
        if let Some(value) = self.accumulate(byte, 4) {
            store(&mut self.response, value);
            self.begin_field(next);
        }
        Step::Continue
    }

    fn on_checksum_type(&mut self, byte: u8) -> Step {
        self.response.checksum_type = byte;
        if ChecksumType::from_byte(byte).is_none() {
            return self.fail(ErrorCode::MalformedFrame);
        }
        self.begin_field(State::Length);
        Step::Continue
    }

    fn on_length(&mut self, byte: u8) -> Step {
        let Some(remaining) = self.accumulate(byte, 4) else {
            return Step::Continue;
        };

        let checksum_len = self.checksum_len() as u32;
        let Some(payload_length) = remaining.checked_sub(checksum_len) else {
            return self.fail(ErrorCode::MalformedFrame);
        };
        // Reject before a single payload byte touches the buffer
        if payload_length as usize > MAX_FRAME_DATA_SIZE {
            return self.fail(ErrorCode::PacketExceedsByteArrayLength);
        }

        self.response.payload_length = payload_length;
        self.after_payload_or(State::Payload);
        Step::Continue
    }

    fn on_payload(&mut self, byte: u8) -> Step {
        // cursor < payload_length <= MAX_FRAME_DATA_SIZE
        self.response.frame_data[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor == self.response.payload_length as usize {
            self.after_payload_or(State::Checksum);
        }
        Step::Continue
    }

    fn on_checksum(&mut self, byte: u8) -> Step {
        self.response.checksum[self.cursor] = byte;
        self.cursor += 1;
        if self.cursor < self.checksum_len() {
            return Step::Continue;
        }

        let kind = self.checksum_kind();
        let valid = checksum::verify(
            &self.policy,
            kind,
            self.response.payload(),
            &self.response.checksum,
        );
        if !valid {
            return self.fail(ErrorCode::ChecksumFailure);
        }
        self.begin_field(State::Footer);
        Step::Continue
    }

    fn on_footer(&mut self, byte: u8) -> Step {
        if byte != FOOTER[self.cursor] {
            let step = self.fail(ErrorCode::MalformedFrame);
            if byte == START_BYTE_1 {
                // Truncated frame; this byte may open the next one
                self.state = State::AwaitHeader2;
            }
            return step;
        }
        self.cursor += 1;
        if self.cursor < FOOTER_SIZE {
            return Step::Continue;
        }

        self.state = State::Complete;
        self.response.complete();
        Step::Complete
    }

    /// Pick the first non-empty section from `from` onwards
    ///
    /// Zero-length payloads skip straight to the checksum, and a frame
    /// without a checksum skips straight to the footer. Verification of a
    /// checksum-less frame always passes, so nothing is lost by skipping.
    fn after_payload_or(&mut self, from: State) {
        let next = match from {
            State::Payload if self.response.payload_length > 0 => State::Payload,
            State::Payload | State::Checksum if self.checksum_len() > 0 => State::Checksum,
            _ => State::Footer,
        };
        self.begin_field(next);
    }

    fn begin_field(&mut self, next: State) {
        self.state = next;
        self.field = 0;
        self.cursor = 0;
    }

    /// Shift one byte into the current integer field
    ///
    /// Returns the value once `width` bytes have been collected.
    fn accumulate(&mut self, byte: u8, width: usize) -> Option<u32> {
        self.field = (self.field << 8) | byte as u32;
        self.cursor += 1;
        (self.cursor == width).then_some(self.field)
    }

    fn checksum_kind(&self) -> ChecksumType {
        ChecksumType::from_byte(self.response.checksum_type).unwrap_or_default()
    }

    fn checksum_len(&self) -> usize {
        self.checksum_kind().len().min(CHECKSUM_SIZE)
    }

    fn fail(&mut self, code: ErrorCode) -> Step {
        self.response.fail(code);
        self.state = State::Errored;
        self.field = 0;
        self.cursor = 0;
        Step::Error(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Digest;
    use crate::frame::{Request, HEADER_SIZE, MAX_FRAME_SIZE};

    const GET_TEMPERATURE_FRAME: [u8; 25] = [
        0xC1, 0xC0, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC2, 0xC3, 0xC4, 0xC5,
    ];

    /// Feed bytes and collect every non-Continue step
    fn feed<P: ChecksumPolicy>(
        assembler: &mut ResponseAssembler<P>,
        bytes: &[u8],
    ) -> std::vec::Vec<Step> {
        bytes
            .iter()
            .map(|&b| assembler.consume(b))
            .filter(|s| *s != Step::Continue)
            .collect()
    }

    fn encode(request: &Request<'_>) -> heapless::Vec<u8, MAX_FRAME_SIZE> {
        request.encode_to_vec(&Md5Checksum).unwrap()
    }

    #[test]
    fn test_get_temperature_one_byte_at_a_time() {
        let mut assembler = ResponseAssembler::new();
        let steps = feed(&mut assembler, &GET_TEMPERATURE_FRAME);

        assert_eq!(steps, [Step::Complete]);
        let response = assembler.response();
        assert!(response.is_available());
        assert_eq!(response.message_type(), 0x0040_0001);
        assert_eq!(response.payload_length(), 0);
        assert_eq!(response.error_code(), ErrorCode::None);
        assert_eq!(response.protocol_version(), 0x1000);
    }

    #[test]
    fn test_decode_all_fields() {
        let payload = [0x01, 0x02, 0x03, 0x04, 0x05];
        let request = Request::new(0x0010_1000)
            .with_payload(&payload)
            .regarding(0xCAFE_F00D)
            .with_flags(0x0003)
            .with_checksum(ChecksumType::Md5);
        let encoded = encode(&request);

        let mut assembler = ResponseAssembler::new();
        assert_eq!(feed(&mut assembler, &encoded), [Step::Complete]);

        let response = assembler.response();
        assert_eq!(response.flags(), 0x0003);
        assert_eq!(response.regarding_id(), 0xCAFE_F00D);
        assert_eq!(response.checksum_type(), 1);
        assert_eq!(response.payload(), &payload);
        assert_eq!(response.checksum(), &Md5Checksum.digest(&payload));
        assert_eq!(response.packet_length(), encoded.len());
    }

    #[test]
    fn test_noise_before_frame_is_discarded() {
        let mut assembler = ResponseAssembler::new();
        let mut data = std::vec![0x00, 0xFF, 0x12, 0xC2];
        data.extend_from_slice(&GET_TEMPERATURE_FRAME);

        assert_eq!(feed(&mut assembler, &data), [Step::Complete]);
        assert_eq!(assembler.response().message_type(), 0x0040_0001);
    }

    #[test]
    fn test_stray_start_byte_resyncs_on_real_frame() {
        let mut assembler = ResponseAssembler::new();
        let mut data = std::vec![START_BYTE_1];
        data.extend_from_slice(&GET_TEMPERATURE_FRAME);

        assert_eq!(
            feed(&mut assembler, &data),
            [Step::Error(ErrorCode::UnexpectedStartByte), Step::Complete]
        );
        assert!(assembler.response().is_available());
        assert!(!assembler.response().is_error());
    }

    #[test]
    fn test_bad_second_header_byte() {
        let mut assembler = ResponseAssembler::new();
        assert_eq!(assembler.consume(START_BYTE_1), Step::Continue);
        assert_eq!(
            assembler.consume(0x00),
            Step::Error(ErrorCode::UnexpectedStartByte)
        );
        assert!(assembler.response().is_error());
        assert!(!assembler.response().is_available());

        // Back to header search without any reset
        assert_eq!(feed(&mut assembler, &GET_TEMPERATURE_FRAME), [Step::Complete]);
    }

    #[test]
    fn test_checksum_failure() {
        let payload = [0x10, 0x20, 0x30];
        let request = Request::new(0x0000_0100)
            .with_payload(&payload)
            .with_checksum(ChecksumType::Md5);
        let mut encoded = encode(&request);
        encoded[HEADER_SIZE + 1] ^= 0x01;

        let mut assembler = ResponseAssembler::new();
        assert_eq!(
            feed(&mut assembler, &encoded),
            [Step::Error(ErrorCode::ChecksumFailure)]
        );
        assert!(!assembler.response().is_available());
        assert_eq!(assembler.response().error_code(), ErrorCode::ChecksumFailure);
    }

    #[test]
    fn test_bad_footer_is_malformed() {
        let mut frame = GET_TEMPERATURE_FRAME;
        frame[23] = 0x00;

        let mut assembler = ResponseAssembler::new();
        assert_eq!(
            feed(&mut assembler, &frame),
            [Step::Error(ErrorCode::MalformedFrame)]
        );
    }

    #[test]
    fn test_truncated_frame_does_not_swallow_next() {
        let payload = [0x01, 0x2C];
        let truncated = encode(
            &Request::new(0x0040_0001)
                .with_payload(&payload)
                .with_checksum(ChecksumType::Md5),
        );
        let cut = truncated.len() - FOOTER_SIZE;

        let mut data = std::vec::Vec::from(&truncated[..cut]);
        data.extend_from_slice(&GET_TEMPERATURE_FRAME[..HEADER_SIZE + 2]);
        data.extend_from_slice(&GET_TEMPERATURE_FRAME);

        let mut assembler = ResponseAssembler::new();
        assert_eq!(
            feed(&mut assembler, &data),
            [
                Step::Error(ErrorCode::MalformedFrame),
                Step::Error(ErrorCode::MalformedFrame),
                Step::Complete
            ]
        );
        assert_eq!(assembler.response().message_type(), 0x0040_0001);
        assert_eq!(assembler.response().payload_length(), 0);
    }

    #[test]
    fn test_unknown_checksum_type_is_malformed() {
        let mut frame = GET_TEMPERATURE_FRAME;
        frame[16] = 0x07;

        let mut assembler = ResponseAssembler::new();
        let steps = feed(&mut assembler, &frame);
        assert_eq!(steps[0], Step::Error(ErrorCode::MalformedFrame));
    }

    #[test]
    fn test_length_shorter_than_checksum_is_malformed() {
        let mut frame = GET_TEMPERATURE_FRAME;
        frame[16] = 0x01; // MD5, but bytes remaining is 0

        let mut assembler = ResponseAssembler::new();
        let steps = feed(&mut assembler, &frame);
        assert_eq!(steps[0], Step::Error(ErrorCode::MalformedFrame));
    }

    #[test]
    fn test_oversized_length_rejected_before_copy() {
        let mut assembler = ResponseAssembler::new();

        // Fill the payload buffer with a sentinel from a legitimate frame
        let sentinel = [0x5Au8; MAX_FRAME_DATA_SIZE];
        let encoded = encode(&Request::new(0x0010_1000).with_payload(&sentinel));
        assert_eq!(feed(&mut assembler, &encoded), [Step::Complete]);
        assembler.begin_cycle();
        assert!(assembler.response().frame_data().iter().all(|&b| b == 0));

        let mut crafted = std::vec::Vec::from(&GET_TEMPERATURE_FRAME[..17]);
        crafted.extend_from_slice(&((MAX_FRAME_DATA_SIZE as u32) + 1).to_be_bytes());
        // Body the device claims to send, which must never land in the buffer
        crafted.extend(core::iter::repeat(0xEE).take(MAX_FRAME_DATA_SIZE + 1));
        crafted.extend_from_slice(&FOOTER);

        let steps = feed(&mut assembler, &crafted);
        assert_eq!(steps, [Step::Error(ErrorCode::PacketExceedsByteArrayLength)]);
        assert!(assembler.response().payload().is_empty());
        assert!(assembler.response().frame_data().iter().all(|&b| b == 0));

        // Still usable afterwards
        assert_eq!(feed(&mut assembler, &GET_TEMPERATURE_FRAME), [Step::Complete]);
    }

    #[test]
    fn test_max_payload_accepted() {
        let payload = [0xA5u8; MAX_FRAME_DATA_SIZE];
        let encoded = encode(
            &Request::new(0x0010_1000)
                .with_payload(&payload)
                .with_checksum(ChecksumType::Md5),
        );

        let mut assembler = ResponseAssembler::new();
        assert_eq!(feed(&mut assembler, &encoded), [Step::Complete]);
        assert_eq!(assembler.response().payload().len(), MAX_FRAME_DATA_SIZE);
    }

    #[test]
    fn test_complete_holds_until_reset() {
        let mut assembler = ResponseAssembler::new();
        feed(&mut assembler, &GET_TEMPERATURE_FRAME);

        assert_eq!(assembler.consume(START_BYTE_1), Step::Complete);
        assert_eq!(assembler.response().message_type(), 0x0040_0001);

        assembler.reset();
        assert!(!assembler.response().is_available());
        assert_eq!(assembler.response().message_type(), 0);
    }

    #[test]
    fn test_begin_cycle_keeps_partial_frame() {
        let mut assembler = ResponseAssembler::new();
        feed(&mut assembler, &GET_TEMPERATURE_FRAME[..10]);
        assert!(assembler.in_frame());

        assembler.begin_cycle();
        assert_eq!(feed(&mut assembler, &GET_TEMPERATURE_FRAME[10..]), [Step::Complete]);
    }

    #[test]
    fn test_second_cycle_does_not_inherit_first() {
        let payload = [1, 2, 3, 4, 5, 6, 7, 8];
        let first = encode(
            &Request::new(0x0000_0080)
                .with_payload(&payload)
                .regarding(99),
        );

        let mut assembler = ResponseAssembler::new();
        feed(&mut assembler, &first);
        assert!(assembler.response().is_available());

        assembler.begin_cycle();
        feed(&mut assembler, &GET_TEMPERATURE_FRAME[..14]);
        let response = assembler.response();
        assert!(!response.is_available());
        assert!(!response.is_error());
        assert_eq!(response.regarding_id(), 0);
        assert!(response.payload().is_empty());
        assert_eq!(response.message_type(), 0x0040_0001);
    }

    #[test]
    fn test_custom_policy() {
        struct Fixed;
        impl ChecksumPolicy for Fixed {
            fn digest(&self, _payload: &[u8]) -> Digest {
                [0x11; CHECKSUM_SIZE]
            }
        }

        let payload = [0x42];
        let encoded = Request::new(0x0000_0090)
            .with_payload(&payload)
            .with_checksum(ChecksumType::Md5)
            .encode_to_vec(&Fixed)
            .unwrap();

        let mut md5 = ResponseAssembler::new();
        assert_eq!(
            feed(&mut md5, &encoded),
            [Step::Error(ErrorCode::ChecksumFailure)]
        );

        let mut fixed = ResponseAssembler::with_policy(Fixed);
        assert_eq!(feed(&mut fixed, &encoded), [Step::Complete]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn checksum_type() -> impl Strategy<Value = ChecksumType> {
            prop_oneof![Just(ChecksumType::None), Just(ChecksumType::Md5)]
        }

        proptest! {
            #[test]
            fn prop_encode_decode_preserves_fields(
                message_type in any::<u32>(),
                regarding_id in any::<u32>(),
                kind in checksum_type(),
                payload in proptest::collection::vec(any::<u8>(), 0..=MAX_FRAME_DATA_SIZE),
            ) {
                let request = Request::new(message_type)
                    .regarding(regarding_id)
                    .with_checksum(kind)
                    .with_payload(&payload);
                let encoded = encode(&request);

                let mut assembler = ResponseAssembler::new();
                prop_assert_eq!(feed(&mut assembler, &encoded), std::vec![Step::Complete]);

                let response = assembler.response();
                prop_assert_eq!(response.message_type(), message_type);
                prop_assert_eq!(response.regarding_id(), regarding_id);
                prop_assert_eq!(response.checksum_kind(), Some(kind));
                prop_assert_eq!(response.payload(), payload.as_slice());
            }

            #[test]
            fn prop_payload_corruption_is_caught(
                payload in proptest::collection::vec(any::<u8>(), 1..256),
                index in any::<prop::sample::Index>(),
                flip in 1u8..=255,
            ) {
                let request = Request::new(0x0010_1000)
                    .with_checksum(ChecksumType::Md5)
                    .with_payload(&payload);
                let mut encoded = encode(&request);
                encoded[HEADER_SIZE + index.index(payload.len())] ^= flip;

                let mut assembler = ResponseAssembler::new();
                let steps = feed(&mut assembler, &encoded);
                prop_assert_eq!(steps, std::vec![Step::Error(ErrorCode::ChecksumFailure)]);
                prop_assert!(!assembler.response().is_available());
            }

            #[test]
            fn prop_single_noise_byte_then_frame(noise in any::<u8>()) {
                let mut data = std::vec![noise];
                data.extend_from_slice(&GET_TEMPERATURE_FRAME);

                let mut assembler = ResponseAssembler::new();
                let steps = feed(&mut assembler, &data);

                let completes = steps.iter().filter(|s| **s == Step::Complete).count();
                prop_assert_eq!(completes, 1);
                prop_assert_eq!(steps.last(), Some(&Step::Complete));
                // At most the one resync error a stray 0xC1 causes
                prop_assert!(steps.len() <= 2);
                prop_assert_eq!(assembler.response().message_type(), 0x0040_0001);
            }
        }
    }
}
