use std::cell::Cell;

use hpke::Kem;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use typenum::Unsigned;

use crate::hpke::{
    CryptError, EncapsulationSize, EncryptedEnvelope, HpkeSealer, IpaKem, IpaPrivateKey,
    IpaPublicKey, Sealer, Serializable, TagSize,
};

/// Deterministic stand-in for HPKE. Output depends only on the public key, plaintext and `info`,
/// so tests can compare blobs byte for byte. It still binds the ciphertext to the recipient key
/// and `info`, and it produces envelopes of the same size as [`HpkeSealer`].
///
/// It provides no secrecy whatsoever.
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeSealer;

impl FakeSealer {
    fn encapsulated_key(pk: &IpaPublicKey) -> Vec<u8> {
        let digest = Sha256::new()
            .chain_update(b"fake-hpke-enc")
            .chain_update(pk.to_bytes())
            .finalize();
        digest[..EncapsulationSize::USIZE].to_vec()
    }

    fn apply_keystream(enc: &[u8], info: &[u8], data: &mut [u8]) {
        for (counter, chunk) in (0_u32..).zip(data.chunks_mut(32)) {
            let block = Sha256::new()
                .chain_update(b"fake-hpke-stream")
                .chain_update(enc)
                .chain_update(info)
                .chain_update(counter.to_le_bytes())
                .finalize();
            for (b, k) in chunk.iter_mut().zip(block) {
                *b ^= k;
            }
        }
    }

    fn tag(pk: &IpaPublicKey, enc: &[u8], info: &[u8], ct: &[u8]) -> Vec<u8> {
        let digest = Sha256::new()
            .chain_update(b"fake-hpke-tag")
            .chain_update(pk.to_bytes())
            .chain_update(enc)
            .chain_update(info)
            .chain_update(ct)
            .finalize();
        digest[..TagSize::USIZE].to_vec()
    }
}

impl Sealer for FakeSealer {
    fn seal<R: CryptoRng + RngCore>(
        &self,
        pk: &IpaPublicKey,
        plaintext: &[u8],
        info: &[u8],
        _rng: &mut R,
    ) -> Result<EncryptedEnvelope, CryptError> {
        let encapsulated_key = Self::encapsulated_key(pk);
        let mut ciphertext = plaintext.to_vec();
        Self::apply_keystream(&encapsulated_key, info, &mut ciphertext);
        let tag = Self::tag(pk, &encapsulated_key, info, &ciphertext);
        ciphertext.extend_from_slice(&tag);

        Ok(EncryptedEnvelope {
            encapsulated_key,
            ciphertext,
            info: info.into(),
        })
    }

    fn open(&self, sk: &IpaPrivateKey, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptError> {
        let pk = IpaKem::sk_to_pk(sk);
        let ct_len = envelope
            .ciphertext
            .len()
            .checked_sub(TagSize::USIZE)
            .ok_or(CryptError::Open)?;
        let (ct, tag) = envelope.ciphertext.split_at(ct_len);

        let expected = Self::tag(&pk, &envelope.encapsulated_key, &envelope.info, ct);
        if !bool::from(expected.ct_eq(tag)) {
            return Err(CryptError::Open);
        }

        let mut plaintext = ct.to_vec();
        Self::apply_keystream(&envelope.encapsulated_key, &envelope.info, &mut plaintext);

        Ok(plaintext)
    }
}

/// Real HPKE that refuses the `fail_at`-th call to `seal` (zero-based).
#[derive(Debug)]
pub struct FailingSealer {
    fail_at: usize,
    calls: Cell<usize>,
}

impl FailingSealer {
    #[must_use]
    pub fn new(fail_at: usize) -> Self {
        Self {
            fail_at,
            calls: Cell::new(0),
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Sealer for FailingSealer {
    fn seal<R: CryptoRng + RngCore>(
        &self,
        pk: &IpaPublicKey,
        plaintext: &[u8],
        info: &[u8],
        rng: &mut R,
    ) -> Result<EncryptedEnvelope, CryptError> {
        let call = self.calls.replace(self.calls.get() + 1);
        if call == self.fail_at {
            return Err(CryptError::Seal);
        }

        HpkeSealer.seal(pk, plaintext, info, rng)
    }

    fn open(&self, sk: &IpaPrivateKey, envelope: &EncryptedEnvelope) -> Result<Vec<u8>, CryptError> {
        HpkeSealer.open(sk, envelope)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::{FailingSealer, FakeSealer};
    use crate::hpke::{CryptError, KeyPair, Sealer};

    #[test]
    fn fake_open_checks_key_and_info() {
        let mut rng = StdRng::seed_from_u64(1);
        let keypair = KeyPair::generate(&mut rng);
        let other = KeyPair::generate(&mut rng);

        let envelope = FakeSealer
            .seal(keypair.public_key(), b"plaintext", b"info", &mut rng)
            .unwrap();
        assert_ne!(b"plaintext".as_slice(), &envelope.ciphertext[..9]);
        assert_eq!(
            b"plaintext".as_slice(),
            FakeSealer.open(keypair.private_key(), &envelope).unwrap()
        );

        assert!(matches!(
            FakeSealer.open(other.private_key(), &envelope),
            Err(CryptError::Open)
        ));

        let mut rebound = envelope.clone();
        rebound.info = b"other".as_slice().into();
        assert!(matches!(
            FakeSealer.open(keypair.private_key(), &rebound),
            Err(CryptError::Open)
        ));

        let mut truncated = envelope;
        truncated.ciphertext.truncate(15);
        assert!(matches!(
            FakeSealer.open(keypair.private_key(), &truncated),
            Err(CryptError::Open)
        ));
    }

    #[test]
    fn failing_sealer_counts_calls() {
        let mut rng = StdRng::seed_from_u64(2);
        let keypair = KeyPair::generate(&mut rng);
        let sealer = FailingSealer::new(1);

        assert!(sealer.seal(keypair.public_key(), b"a", b"", &mut rng).is_ok());
        assert!(sealer.seal(keypair.public_key(), b"b", b"", &mut rng).is_err());
        assert!(sealer.seal(keypair.public_key(), b"c", b"", &mut rng).is_ok());
        assert_eq!(3, sealer.calls());
    }
}
