//! Fixed-width binary encoding for everything that goes on the wire or into HPKE `info`.
//!
//! Integers are always encoded in little-endian byte order, regardless of the host. Strings are
//! raw UTF-8 bytes, either followed by a single `0x00` terminator when they are concatenated with
//! other fields, or unterminated when they occupy the tail of a container whose length is known.

use std::convert::Infallible;

use bytes::BufMut;
use generic_array::{ArrayLength, GenericArray};
use typenum::{U1, U2, U8, Unsigned};

use crate::error::BoxError;

/// Terminates strings that are concatenated inline.
pub const STRING_TERMINATOR: u8 = 0;

#[derive(Debug, thiserror::Error)]
pub enum MalformedInput {
    #[error("input is too short: {actual} bytes, expected at least {expected}")]
    TooShort { expected: usize, actual: usize },
    #[error("string is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("{0}")]
    InvalidValue(#[source] BoxError),
}

/// Trait for items that have fixed-byte length representation.
pub trait Serializable: Sized {
    /// Required number of bytes to store this message on disk/network
    type Size: ArrayLength;
    /// The error type that can be returned if an error occurs during deserialization.
    type DeserializationError: std::error::Error + Send + Sync + 'static;

    /// Serialize this message to a mutable slice. It is enforced at compile time or on the caller
    /// side that this slice is sized to fit this instance. Implementations do not need to check
    /// the buffer size.
    fn serialize(&self, buf: &mut GenericArray<u8, Self::Size>);

    /// Deserialize message from a sequence of bytes. Similar to [`serialize`], it is enforced that
    /// buffer has enough capacity to fit instances of this trait.
    ///
    /// [`serialize`]: Self::serialize
    ///
    /// ## Errors
    /// In general, deserialization may fail even if buffer size is enough. The bytes may
    /// not represent a valid value in the domain, in this case implementations will return an error.
    fn deserialize(buf: &GenericArray<u8, Self::Size>) -> Result<Self, Self::DeserializationError>;

    /// Reads an instance from the first `Self::Size` bytes of `buf`. Trailing bytes are ignored.
    ///
    /// ## Errors
    /// If `buf` is shorter than `Self::Size` or the leading bytes are not a valid representation
    /// of `Self`.
    fn read_from(buf: &[u8]) -> Result<Self, MalformedInput> {
        let Some(prefix) = buf.get(..Self::Size::USIZE) else {
            return Err(MalformedInput::TooShort {
                expected: Self::Size::USIZE,
                actual: buf.len(),
            });
        };

        Self::deserialize(GenericArray::from_slice(prefix))
            .map_err(|e| MalformedInput::InvalidValue(e.into()))
    }

    /// Appends the serialized representation of this instance to `out`.
    fn write_to<B: BufMut>(&self, out: &mut B) {
        let mut buf = GenericArray::default();
        self.serialize(&mut buf);
        out.put_slice(&buf);
    }
}

macro_rules! le_serializable {
    ($ty:ty, $size:ty) => {
        impl Serializable for $ty {
            type Size = $size;
            type DeserializationError = Infallible;

            fn serialize(&self, buf: &mut GenericArray<u8, Self::Size>) {
                buf.copy_from_slice(&self.to_le_bytes());
            }

            fn deserialize(
                buf: &GenericArray<u8, Self::Size>,
            ) -> Result<Self, Self::DeserializationError> {
                let mut raw = [0_u8; <$size as Unsigned>::USIZE];
                raw.copy_from_slice(buf);
                Ok(<$ty>::from_le_bytes(raw))
            }
        }
    };
}

le_serializable!(u8, U1);
le_serializable!(u16, U2);
le_serializable!(u64, U8);

/// Appends `s` followed by [`STRING_TERMINATOR`].
pub fn put_terminated_str<B: BufMut>(out: &mut B, s: &str) {
    out.put_slice(s.as_bytes());
    out.put_u8(STRING_TERMINATOR);
}

/// Interprets the whole of `buf` as an unterminated UTF-8 string.
///
/// ## Errors
/// If `buf` is not valid UTF-8.
pub fn str_from_tail(buf: &[u8]) -> Result<&str, MalformedInput> {
    Ok(std::str::from_utf8(buf)?)
}
