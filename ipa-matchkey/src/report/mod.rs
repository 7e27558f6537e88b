use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use generic_array::GenericArray;
use typenum::U1;

use crate::{
    error::BoxError,
    ff::{MalformedInput, Serializable},
    hpke::CryptError,
};

mod matchkey;

pub use matchkey::{
    EncryptedMatchKeyReport, FieldLengths, MatchKeyReport, decrypt_blob, encrypt_match_key,
};

pub type KeyIdentifier = u8;
pub const DEFAULT_KEY_ID: KeyIdentifier = 0;

/// Event epoch. Epochs are used to authenticate match key encryption and are reserved for key
/// rotation. No rotation protocol exists yet, so reports are always produced for
/// [`DEFAULT_EPOCH`].
pub type Epoch = u16;
pub const DEFAULT_EPOCH: Epoch = 0;

/// Whether the event that produced the match key is an attribution source or a trigger.
/// Serialized as a single byte everywhere: in HPKE `info` and in the encrypted report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum EventType {
    Source,
    Trigger,
}

#[derive(thiserror::Error, Debug)]
#[error("{0} is not a valid event type, only 0 and 1 are allowed.")]
pub struct UnknownEventType(pub u8);

impl Serializable for EventType {
    type Size = U1;
    type DeserializationError = UnknownEventType;

    fn serialize(&self, buf: &mut GenericArray<u8, Self::Size>) {
        buf[0] = u8::from(self);
    }

    fn deserialize(buf: &GenericArray<u8, Self::Size>) -> Result<Self, Self::DeserializationError> {
        Self::try_from(buf[0])
    }
}

impl TryFrom<u8> for EventType {
    type Error = UnknownEventType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Source),
            1 => Ok(Self::Trigger),
            _ => Err(UnknownEventType(value)),
        }
    }
}

impl From<&EventType> for u8 {
    fn from(value: &EventType) -> Self {
        match value {
            EventType::Source => 0,
            EventType::Trigger => 1,
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Trigger => "trigger",
        })
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "trigger" => Ok(Self::Trigger),
            _ => Err(format!(
                "{s} is not a valid event type, expected source or trigger"
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidReportError {
    #[error("{0}")]
    BadEventType(#[from] UnknownEventType),
    #[error("bad site_domain: {0}")]
    SiteDomain(#[source] MalformedInput),
    #[error("en/decryption failure: {0}")]
    Crypt(#[from] CryptError),
    #[error("failed to deserialize field {0}: {1}")]
    DeserializationError(&'static str, #[source] BoxError),
    #[error("report is too short: {0}, expected length at least: {1}")]
    Length(usize, usize),
}
