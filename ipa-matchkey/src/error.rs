use thiserror::Error;

use crate::{ff::MalformedInput, hpke::CryptError, report::InvalidReportError};

/// An error raised while sharing, encrypting or decrypting match keys.
///
/// Lower layers have their own error types:
///  * `ipa_matchkey::ff::MalformedInput`, for binary decoding
///  * `ipa_matchkey::hpke::CryptError`, for HPKE sealing and opening
///  * `ipa_matchkey::report::InvalidReportError`, for the wire blob
///
/// All of them collapse into this type, keeping authentication failures apart from format
/// failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("malformed hex-encoded key: {0}")]
    HexDecode(#[from] hex::FromHexError),
    #[error("failed to seal match key share")]
    EncryptionFailed,
    #[error("failed to open ciphertext: tag does not verify against key and info")]
    AuthenticationFailed,
    #[error("malformed input: {0}")]
    MalformedInput(#[source] BoxError),
    #[error("entropy source exhausted")]
    EntropySourceExhausted,
    #[error("inconsistent shares")]
    InconsistentShares,
    #[error("problem during IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<MalformedInput> for Error {
    fn from(err: MalformedInput) -> Self {
        Self::MalformedInput(err.into())
    }
}

impl From<CryptError> for Error {
    fn from(err: CryptError) -> Self {
        match err {
            CryptError::NoSuchKey(key_id) => {
                Self::Config(format!("no private key registered for key id {key_id}"))
            }
            CryptError::Seal => Self::EncryptionFailed,
            CryptError::Open => Self::AuthenticationFailed,
        }
    }
}

impl From<InvalidReportError> for Error {
    fn from(err: InvalidReportError) -> Self {
        match err {
            InvalidReportError::Crypt(e) => e.into(),
            e => Self::MalformedInput(e.into()),
        }
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[cfg(test)]
mod tests {
    use crate::{
        error::Error,
        ff::MalformedInput,
        hpke::CryptError,
        report::{InvalidReportError, UnknownEventType},
    };

    #[test]
    fn crypt_errors_stay_distinguishable() {
        assert!(matches!(
            Error::from(InvalidReportError::Crypt(CryptError::Open)),
            Error::AuthenticationFailed
        ));
        assert!(matches!(
            Error::from(InvalidReportError::Crypt(CryptError::Seal)),
            Error::EncryptionFailed
        ));
        assert!(matches!(
            Error::from(CryptError::NoSuchKey(4)),
            Error::Config(msg) if msg.contains('4')
        ));
    }

    #[test]
    fn format_errors_are_malformed_input() {
        assert!(matches!(
            Error::from(InvalidReportError::Length(3, 70)),
            Error::MalformedInput(_)
        ));
        assert!(matches!(
            Error::from(InvalidReportError::BadEventType(UnknownEventType(7))),
            Error::MalformedInput(_)
        ));
        assert!(matches!(
            Error::from(MalformedInput::TooShort {
                expected: 8,
                actual: 1
            }),
            Error::MalformedInput(_)
        ));
    }
}
