//! Packet checksum selection and validation
//!
//! A frame carries either no checksum or a 16-byte digest of its payload.
//! The digest algorithm sits behind [`ChecksumPolicy`]; the device documents
//! it as MD5, which is what [`Md5Checksum`] computes.

use md5::{Digest as _, Md5};

/// Size of a digest on the wire
pub const CHECKSUM_SIZE: usize = 16;

/// Raw digest bytes
pub type Digest = [u8; CHECKSUM_SIZE];

/// Checksum type byte carried in every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ChecksumType {
    /// No checksum bytes follow the payload
    #[default]
    None,
    /// 16-byte digest follows the payload
    Md5,
}

// Wire format values
const CHECKSUM_NONE: u8 = 0x00;
const CHECKSUM_MD5: u8 = 0x01;

impl ChecksumType {
    /// Parse from the wire byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            CHECKSUM_NONE => Some(ChecksumType::None),
            CHECKSUM_MD5 => Some(ChecksumType::Md5),
            _ => None,
        }
    }

    /// Convert to the wire byte
    pub fn to_byte(self) -> u8 {
        match self {
            ChecksumType::None => CHECKSUM_NONE,
            ChecksumType::Md5 => CHECKSUM_MD5,
        }
    }

    /// Number of checksum bytes on the wire
    pub fn len(self) -> usize {
        match self {
            ChecksumType::None => 0,
            ChecksumType::Md5 => CHECKSUM_SIZE,
        }
    }
}

/// Digest algorithm used for checksum type 1
pub trait ChecksumPolicy {
    /// Compute the digest of a payload
    fn digest(&self, payload: &[u8]) -> Digest;

    /// Check a payload against the digest received with it
    fn verify(&self, payload: &[u8], declared: &Digest) -> bool {
        self.digest(payload) == *declared
    }
}

impl<P: ChecksumPolicy + ?Sized> ChecksumPolicy for &P {
    fn digest(&self, payload: &[u8]) -> Digest {
        (**self).digest(payload)
    }

    fn verify(&self, payload: &[u8], declared: &Digest) -> bool {
        (**self).verify(payload, declared)
    }
}

/// MD5 digest policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Md5Checksum;

impl ChecksumPolicy for Md5Checksum {
    fn digest(&self, payload: &[u8]) -> Digest {
        let mut digest = [0u8; CHECKSUM_SIZE];
        digest.copy_from_slice(&Md5::digest(payload));
        digest
    }
}

/// Checksum bytes for one frame
///
/// Unused bytes stay zero when the type is [`ChecksumType::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum {
    kind: ChecksumType,
    bytes: Digest,
}

impl Checksum {
    /// Compute the checksum a frame with this payload must carry
    pub fn compute<P: ChecksumPolicy>(policy: &P, kind: ChecksumType, payload: &[u8]) -> Self {
        let bytes = match kind {
            ChecksumType::None => [0u8; CHECKSUM_SIZE],
            ChecksumType::Md5 => policy.digest(payload),
        };
        Self { kind, bytes }
    }

    pub fn kind(&self) -> ChecksumType {
        self.kind
    }

    /// The bytes that go on the wire (0 or 16)
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.kind.len()]
    }
}

/// Validate a received payload against its declared checksum
pub fn verify<P: ChecksumPolicy>(
    policy: &P,
    kind: ChecksumType,
    payload: &[u8],
    declared: &Digest,
) -> bool {
    match kind {
        ChecksumType::None => true,
        ChecksumType::Md5 => policy.verify(payload, declared),
    }
}
