//! Message types for the STS protocol
//!
//! Every command is identified by an opaque 32-bit message type. The
//! spectrometer echoes the type in its reply. [`Command`] covers the
//! commands this driver knows how to build.

use heapless::Vec;

use crate::frame::Request;

// Message type IDs
pub const MSG_GET_HW_VERSION: u32 = 0x0000_0080;
pub const MSG_GET_SW_VERSION: u32 = 0x0000_0090;
pub const MSG_GET_SERIAL_NUMBER: u32 = 0x0000_0100;
pub const MSG_GET_CORRECTED_SPECTRUM: u32 = 0x0010_1000;
pub const MSG_SET_INTEGRATION_TIME: u32 = 0x0011_0010;
pub const MSG_GET_AVG_SCANS: u32 = 0x0011_0510;
pub const MSG_SET_AVG_SCANS: u32 = 0x0012_0010;
pub const MSG_GET_TEMPERATURE: u32 = 0x0040_0001;

/// Largest argument any [`Command`] carries
pub const MAX_COMMAND_ARGS: usize = 4;

/// Known command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    GetHardwareVersion,
    GetSoftwareVersion,
    GetSerialNumber,
    GetCorrectedSpectrum,
    SetIntegrationTime,
    GetAveragedScans,
    SetAveragedScans,
    GetTemperature,
}

impl MessageType {
    /// Parse from the wire identifier
    pub fn from_u32(id: u32) -> Option<Self> {
        match id {
            MSG_GET_HW_VERSION => Some(MessageType::GetHardwareVersion),
            MSG_GET_SW_VERSION => Some(MessageType::GetSoftwareVersion),
            MSG_GET_SERIAL_NUMBER => Some(MessageType::GetSerialNumber),
            MSG_GET_CORRECTED_SPECTRUM => Some(MessageType::GetCorrectedSpectrum),
            MSG_SET_INTEGRATION_TIME => Some(MessageType::SetIntegrationTime),
            MSG_GET_AVG_SCANS => Some(MessageType::GetAveragedScans),
            MSG_SET_AVG_SCANS => Some(MessageType::SetAveragedScans),
            MSG_GET_TEMPERATURE => Some(MessageType::GetTemperature),
            _ => None,
        }
    }

    /// Convert to the wire identifier
    pub fn to_u32(self) -> u32 {
        match self {
            MessageType::GetHardwareVersion => MSG_GET_HW_VERSION,
            MessageType::GetSoftwareVersion => MSG_GET_SW_VERSION,
            MessageType::GetSerialNumber => MSG_GET_SERIAL_NUMBER,
            MessageType::GetCorrectedSpectrum => MSG_GET_CORRECTED_SPECTRUM,
            MessageType::SetIntegrationTime => MSG_SET_INTEGRATION_TIME,
            MessageType::GetAveragedScans => MSG_GET_AVG_SCANS,
            MessageType::SetAveragedScans => MSG_SET_AVG_SCANS,
            MessageType::GetTemperature => MSG_GET_TEMPERATURE,
        }
    }
}

/// Commands the driver can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    GetHardwareVersion,
    GetSoftwareVersion,
    GetSerialNumber,
    /// Request one corrected spectrum
    GetCorrectedSpectrum,
    /// Integration time in microseconds
    SetIntegrationTime(u32),
    GetAveragedScans,
    /// Number of scans to average per spectrum
    SetAveragedScans(u16),
    GetTemperature,
}

impl Command {
    pub fn message_type(&self) -> MessageType {
        match self {
            Command::GetHardwareVersion => MessageType::GetHardwareVersion,
            Command::GetSoftwareVersion => MessageType::GetSoftwareVersion,
            Command::GetSerialNumber => MessageType::GetSerialNumber,
            Command::GetCorrectedSpectrum => MessageType::GetCorrectedSpectrum,
            Command::SetIntegrationTime(_) => MessageType::SetIntegrationTime,
            Command::GetAveragedScans => MessageType::GetAveragedScans,
            Command::SetAveragedScans(_) => MessageType::SetAveragedScans,
            Command::GetTemperature => MessageType::GetTemperature,
        }
    }

    /// Argument bytes, big-endian
    pub fn payload(&self) -> Vec<u8, MAX_COMMAND_ARGS> {
        let mut payload = Vec::new();
        // Arguments never exceed MAX_COMMAND_ARGS
        let _ = match self {
            Command::SetIntegrationTime(us) => payload.extend_from_slice(&us.to_be_bytes()),
            Command::SetAveragedScans(scans) => payload.extend_from_slice(&scans.to_be_bytes()),
            _ => Ok(()),
        };
        payload
    }

    /// Build the request for this command around an argument buffer
    ///
    /// `payload` must outlive the request, so the caller keeps the buffer
    /// returned by [`Command::payload`].
    pub fn to_request<'a>(&self, payload: &'a [u8]) -> Request<'a> {
        Request::for_message(self.message_type()).with_payload(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_roundtrip() {
        let types = [
            MessageType::GetHardwareVersion,
            MessageType::GetSoftwareVersion,
            MessageType::GetSerialNumber,
            MessageType::GetCorrectedSpectrum,
            MessageType::SetIntegrationTime,
            MessageType::GetAveragedScans,
            MessageType::SetAveragedScans,
            MessageType::GetTemperature,
        ];

        for kind in types {
            assert_eq!(MessageType::from_u32(kind.to_u32()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_message_type() {
        assert_eq!(MessageType::from_u32(0xDEAD_BEEF), None);
    }

    #[test]
    fn test_get_temperature_identifier() {
        assert_eq!(MessageType::GetTemperature.to_u32(), 0x0040_0001);
    }

    #[test]
    fn test_set_integration_time_payload() {
        let cmd = Command::SetIntegrationTime(100_000);
        assert_eq!(cmd.payload().as_slice(), &[0x00, 0x01, 0x86, 0xA0]);
        assert_eq!(cmd.message_type(), MessageType::SetIntegrationTime);
    }

    #[test]
    fn test_set_averaged_scans_payload() {
        let cmd = Command::SetAveragedScans(10);
        assert_eq!(cmd.payload().as_slice(), &[0x00, 0x0A]);
    }

    #[test]
    fn test_query_commands_have_no_payload() {
        assert!(Command::GetTemperature.payload().is_empty());
        assert!(Command::GetCorrectedSpectrum.payload().is_empty());
    }

    #[test]
    fn test_to_request() {
        let cmd = Command::SetIntegrationTime(5000);
        let args = cmd.payload();
        let request = cmd.to_request(&args);
        assert_eq!(request.message_type, MSG_SET_INTEGRATION_TIME);
        assert_eq!(request.payload, &[0x00, 0x00, 0x13, 0x88]);
    }
}
