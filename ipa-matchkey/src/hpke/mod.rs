//! HPKE encryption primitives for match key shares, following the [`IPA encryption`] design.
//!
//! [`IPA encryption`]: https://github.com/patcg-individual-drafts/ipa/blob/main/details/encryption.md

use hpke::{
    OpModeR, OpModeS, aead::AeadTag, single_shot_open_in_place_detached,
    single_shot_seal_in_place_detached,
};
use rand_core::{CryptoRng, RngCore};
use typenum::Unsigned;

mod info;
mod registry;

pub use info::Info;
pub use registry::{KeyPair, KeyRegistry, PrivateKeyOnly, PrivateKeyRegistry};

use crate::report::KeyIdentifier;

/// Match key ciphersuite: X25519 key agreement, HKDF-SHA256, AES-256-GCM.
pub(crate) type IpaKem = hpke::kem::X25519HkdfSha256;
pub(crate) type IpaAead = hpke::aead::AesGcm256;
pub(crate) type IpaKdf = hpke::kdf::HkdfSha256;

pub type EncapsulationSize = <<IpaKem as hpke::Kem>::EncappedKey as Serializable>::OutputSize;
pub type TagSize = <AeadTag<IpaAead> as Serializable>::OutputSize;

pub type IpaPublicKey = <IpaKem as hpke::kem::Kem>::PublicKey;
pub type IpaPrivateKey = <IpaKem as hpke::kem::Kem>::PrivateKey;
pub type IpaEncapsulatedKey = <IpaKem as hpke::kem::Kem>::EncappedKey;

pub use hpke::{Deserializable, Serializable};

#[derive(Debug, thiserror::Error)]
pub enum CryptError {
    #[error("Unknown key {0}")]
    NoSuchKey(KeyIdentifier),
    #[error("Failed to seal plaintext")]
    Seal,
    #[error("Failed to open ciphertext")]
    Open,
}

/// Output of one sealing operation, together with the `info` bytes it is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub encapsulated_key: Vec<u8>,
    /// Ciphertext with the AEAD tag appended.
    pub ciphertext: Vec<u8>,
    pub info: Box<[u8]>,
}

/// HPKE capability consumed by report encryption. Production code uses [`HpkeSealer`]; tests may
/// substitute a deterministic implementation.
pub trait Sealer {
    /// Seals `plaintext` towards `pk`, authenticating `info`.
    ///
    /// ## Errors
    /// If the underlying primitive rejects the key or the input.
    fn seal<R: CryptoRng + RngCore>(
        &self,
        pk: &IpaPublicKey,
        plaintext: &[u8],
        info: &[u8],
        rng: &mut R,
    ) -> Result<EncryptedEnvelope, CryptError>;

    /// Opens `envelope` with `sk`.
    ///
    /// ## Errors
    /// If the tag does not verify against the encapsulated key, `info` and `sk`.
    fn open(&self, sk: &IpaPrivateKey, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptError>;
}

/// [`Sealer`] backed by single-shot HPKE in base mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct HpkeSealer;

impl Sealer for HpkeSealer {
    fn seal<R: CryptoRng + RngCore>(
        &self,
        pk: &IpaPublicKey,
        plaintext: &[u8],
        info: &[u8],
        rng: &mut R,
    ) -> Result<EncryptedEnvelope, CryptError> {
        let mut ciphertext = Vec::with_capacity(plaintext.len() + TagSize::USIZE);
        ciphertext.extend_from_slice(plaintext);
        let (encap_key, _, tag) = seal_in_place(pk, &mut ciphertext, info, rng)?;
        let encapsulated_key = encap_key.to_bytes().to_vec();
        ciphertext.extend_from_slice(&tag.to_bytes());

        Ok(EncryptedEnvelope {
            encapsulated_key,
            ciphertext,
            info: info.into(),
        })
    }

    fn open(&self, sk: &IpaPrivateKey, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptError> {
        let mut ciphertext = envelope.ciphertext.clone();
        let len = open_in_place(sk, &envelope.encapsulated_key, &mut ciphertext, &envelope.info)?
            .len();
        ciphertext.truncate(len);

        Ok(ciphertext)
    }
}

/// Opens the given ciphertext in place with `sk`, applying [`HPKE decryption`].
///
/// This function mutates the provided ciphertext slice and replaces it with the plaintext obtained
/// after opening the ciphertext. The result will contain a pointer to the plaintext slice.
/// Note that if the ciphertext slice does not include authentication tag, decryption
/// will fail.
///
/// ## Errors
/// If ciphertext cannot be opened for any reason.
///
/// [`HPKE decryption`]: https://datatracker.ietf.org/doc/html/rfc9180#name-encryption-and-decryption
pub fn open_in_place<'a>(
    sk: &IpaPrivateKey,
    enc: &[u8],
    ciphertext: &'a mut [u8],
    info: &[u8],
) -> Result<&'a [u8], CryptError> {
    let encap_key = IpaEncapsulatedKey::from_bytes(enc).map_err(|_| CryptError::Open)?;
    let Some(ct_len) = ciphertext.len().checked_sub(TagSize::USIZE) else {
        return Err(CryptError::Open);
    };
    let (ct, tag) = ciphertext.split_at_mut(ct_len);
    let tag = AeadTag::<IpaAead>::from_bytes(tag).map_err(|_| CryptError::Open)?;

    single_shot_open_in_place_detached::<_, IpaKdf, IpaKem>(
        &OpModeR::Base,
        sk,
        &encap_key,
        info,
        ct,
        &[],
        &tag,
    )
    .map_err(|_| CryptError::Open)?;

    // at this point ct is no longer a pointer to the ciphertext.
    let pt = ct;
    Ok(pt)
}

// Avoids a clippy "complex type" warning on the return type from `seal_in_place`.
// Not intended to be widely used.
pub(crate) type Ciphertext<'a> = (IpaEncapsulatedKey, &'a [u8], AeadTag<IpaAead>);

/// ## Errors
/// If the match key cannot be sealed for any reason.
pub(crate) fn seal_in_place<'a, R: CryptoRng + RngCore>(
    pk: &IpaPublicKey,
    plaintext: &'a mut [u8],
    info: &[u8],
    rng: &mut R,
) -> Result<Ciphertext<'a>, CryptError> {
    let (encap_key, tag) = single_shot_seal_in_place_detached::<IpaAead, IpaKdf, IpaKem, _>(
        &OpModeS::Base,
        pk,
        info,
        plaintext,
        &[],
        rng,
    )
    .map_err(|_| CryptError::Seal)?;

    // at this point `plaintext` is no longer a pointer to the plaintext.
    Ok((encap_key, plaintext, tag))
}
