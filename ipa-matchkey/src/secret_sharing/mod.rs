//! Replicated XOR sharing of match keys across three helpers.
//!
//! A match key `x` is split using two random words `a` and `b` and `c = a ^ b ^ x`. Helpers
//! receive `(a, b)`, `(b, c)` and `(c, a)`: the right word of each share equals the left word
//! of the next one, any two shares reveal all three words and a single share is uniformly
//! distributed regardless of `x`.

use std::fmt::{Debug, Formatter};

use generic_array::GenericArray;
use rand::thread_rng;
use rand_core::{CryptoRng, RngCore};
use typenum::U16;

use crate::{error::Error, ff::Serializable};

/// Secret identifier correlating events across parties. Never leaves the device in the clear.
pub type MatchKey = u64;

/// One helper's view of a shared match key: two out of three XOR shares.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Share(u64, u64);

impl Share {
    #[must_use]
    pub fn new(left: u64, right: u64) -> Self {
        Self(left, right)
    }

    #[must_use]
    pub fn left(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn right(&self) -> u64 {
        self.1
    }

    #[must_use]
    pub fn as_tuple(&self) -> (u64, u64) {
        (self.0, self.1)
    }
}

impl Debug for Share {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:#018x}, {:#018x})", self.0, self.1)
    }
}

impl Serializable for Share {
    type Size = U16;
    type DeserializationError = std::convert::Infallible;

    fn serialize(&self, buf: &mut GenericArray<u8, Self::Size>) {
        let (left, right) = buf.split_at_mut(8);
        self.0.serialize(GenericArray::from_mut_slice(left));
        self.1.serialize(GenericArray::from_mut_slice(right));
    }

    fn deserialize(buf: &GenericArray<u8, Self::Size>) -> Result<Self, Self::DeserializationError> {
        let (left, right) = buf.split_at(8);
        Ok(Self(
            u64::deserialize(GenericArray::from_slice(left))?,
            u64::deserialize(GenericArray::from_slice(right))?,
        ))
    }
}

pub trait IntoShares<T>: Sized {
    /// Shares this value using the thread-local CSPRNG.
    ///
    /// ## Errors
    /// If the randomness source fails to produce output.
    fn share(self) -> Result<[T; 3], Error> {
        self.share_with(&mut thread_rng())
    }

    /// ## Errors
    /// If `rng` fails to produce output.
    fn share_with<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<[T; 3], Error>;
}

fn random_word<R: RngCore>(rng: &mut R) -> Result<u64, Error> {
    let mut buf = [0_u8; 8];
    rng.try_fill_bytes(&mut buf)
        .map_err(|_| Error::EntropySourceExhausted)?;
    Ok(u64::from_le_bytes(buf))
}

impl IntoShares<Share> for MatchKey {
    fn share_with<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<[Share; 3], Error> {
        let a = random_word(rng)?;
        let b = random_word(rng)?;
        let c = a ^ b ^ self;

        Ok([Share(a, b), Share(b, c), Share(c, a)])
    }
}

/// Recovers the shared value from helper shares.
pub trait Reconstruct<T> {
    /// ## Errors
    /// If the shares were not produced by the same sharing.
    fn reconstruct(&self) -> Result<T, Error>;
}

impl Reconstruct<MatchKey> for [Share; 3] {
    fn reconstruct(&self) -> Result<MatchKey, Error> {
        let [s0, s1, s2] = self;
        if s0.right() != s1.left() || s1.right() != s2.left() || s2.right() != s0.left() {
            return Err(Error::InconsistentShares);
        }

        Ok(s0.left() ^ s0.right() ^ s2.left())
    }
}

/// Any two distinct shares suffice, in either order.
impl Reconstruct<MatchKey> for [Share; 2] {
    fn reconstruct(&self) -> Result<MatchKey, Error> {
        let [x, y] = self;
        if x.right() == y.left() {
            Ok(x.left() ^ x.right() ^ y.right())
        } else if y.right() == x.left() {
            Ok(y.left() ^ y.right() ^ x.right())
        } else {
            Err(Error::InconsistentShares)
        }
    }
}
