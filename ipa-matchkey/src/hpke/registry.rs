use std::{
    fmt::{Debug, Formatter},
    ops::Deref,
};

use hpke::Serializable;
use rand_core::{CryptoRng, RngCore};

use super::{IpaKem, IpaPrivateKey, IpaPublicKey, KeyIdentifier};

/// A pair of secret key and public key. Public keys are used by devices to encrypt match key
/// shares towards helpers, secret keys are used by helpers to open the ciphertexts.
pub struct KeyPair {
    pk: IpaPublicKey,
    sk: IpaPrivateKey,
}

impl From<(IpaPrivateKey, IpaPublicKey)> for KeyPair {
    fn from(value: (IpaPrivateKey, IpaPublicKey)) -> Self {
        Self {
            pk: value.1,
            sk: value.0,
        }
    }
}

impl KeyPair {
    pub fn generate<R: RngCore + CryptoRng>(mut r: &mut R) -> Self {
        <IpaKem as hpke::Kem>::gen_keypair(&mut r).into()
    }

    #[must_use]
    pub fn public_key(&self) -> &IpaPublicKey {
        &self.pk
    }

    #[must_use]
    pub fn private_key(&self) -> &IpaPrivateKey {
        &self.sk
    }

    /// Returns the public key bytes. With X25519 crate it is possible to borrow those bytes, but
    /// hpke crate wraps those types and does not offer `as_bytes`.
    #[must_use]
    pub fn pk_bytes(&self) -> Box<[u8]> {
        self.pk.to_bytes().as_slice().into()
    }

    /// Returns the secret key bytes, for the same reason as [`pk_bytes`] it returns an owned slice,
    /// instead of borrow.
    ///
    /// [`pk_bytes`]: Self::pk_bytes
    #[must_use]
    pub fn sk_bytes(&self) -> Box<[u8]> {
        self.sk.to_bytes().as_slice().into()
    }
}

// This newtype is necessary because IpaPrivateKey is an associated type from another crate (hpke).
// The coherence rules prohibit us from implementing `PrivateKeyRegistry` both for our concrete type
// `KeyPair` and for `IpaPrivateKey`, because the impls would overlap if hpke chose to define
// `IpaPrivateKey` to be the same as `KeyPair`.
pub struct PrivateKeyOnly(pub IpaPrivateKey);

impl Deref for PrivateKeyOnly {
    type Target = IpaPrivateKey;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&KeyRegistry<KeyPair>> for KeyRegistry<PrivateKeyOnly> {
    fn from(key_registry: &KeyRegistry<KeyPair>) -> Self {
        let keys = key_registry
            .keys
            .iter()
            .map(|k| PrivateKeyOnly(k.sk.clone()))
            .collect::<Vec<_>>();
        Self {
            keys: keys.into_boxed_slice(),
        }
    }
}

/// Resolves the [`KeyIdentifier`] carried by an encrypted report into the helper's secret key.
pub trait PrivateKeyRegistry: Send + Sync + 'static {
    fn private_key(&self, key_id: KeyIdentifier) -> Option<&IpaPrivateKey>;
}

/// A registry that holds all the keys available to a helper, indexed by key identifier.
pub struct KeyRegistry<K> {
    keys: Box<[K]>,
}

impl<K> Debug for KeyRegistry<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry")
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

impl<K> KeyRegistry<K> {
    /// Create a key registry with no keys. Since the registry is immutable, it is useless,
    /// but this avoids `Option<KeyRegistry>` when the registry is ultimately not optional.
    #[must_use]
    pub fn empty() -> Self {
        Self { keys: Box::new([]) }
    }

    pub fn from_keys<const N: usize, I: Into<K>>(pairs: [I; N]) -> Self {
        Self {
            keys: pairs
                .into_iter()
                .map(Into::into)
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    fn key(&self, key_id: KeyIdentifier) -> Option<&K> {
        self.keys.get(usize::from(key_id))
    }
}

impl KeyRegistry<KeyPair> {
    #[cfg(any(test, feature = "test-fixture"))]
    pub fn random<R: RngCore + CryptoRng>(keys_count: usize, r: &mut R) -> Self {
        let keys = (0..keys_count).map(|_| KeyPair::generate(r)).collect::<Vec<_>>();

        Self {
            keys: keys.into_boxed_slice(),
        }
    }
}

impl PrivateKeyRegistry for KeyRegistry<KeyPair> {
    fn private_key(&self, key_id: KeyIdentifier) -> Option<&IpaPrivateKey> {
        self.key(key_id).map(|v| &v.sk)
    }
}

impl PrivateKeyRegistry for KeyRegistry<PrivateKeyOnly> {
    fn private_key(&self, key_id: KeyIdentifier) -> Option<&IpaPrivateKey> {
        self.key(key_id).map(|sk| &**sk)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::hpke::{CryptError, HpkeSealer, Sealer};

    const INFO_STR: &[u8] = b"This is an INFO string.";

    #[test]
    fn encrypt_decrypt() {
        let mut rng = StdRng::seed_from_u64(42);
        let keypair1 = KeyPair::generate(&mut rng);
        let keypair2 = KeyPair::generate(&mut rng);
        let pk = keypair1.public_key().clone();

        let registry = KeyRegistry::<KeyPair>::from_keys([keypair1, keypair2]);
        let pt = b"This is a plaintext.";
        let envelope = HpkeSealer.seal(&pk, pt, INFO_STR, &mut rng).unwrap();
        assert_eq!(
            pt.to_vec(),
            HpkeSealer
                .open(registry.private_key(0).unwrap(), &envelope)
                .unwrap()
        );

        assert!(matches!(
            HpkeSealer.open(registry.private_key(1).unwrap(), &envelope),
            Err(CryptError::Open)
        ));
    }

    #[test]
    fn unknown_key_id() {
        let mut rng = StdRng::seed_from_u64(1);
        let registry = KeyRegistry::random(2, &mut rng);
        assert!(registry.private_key(1).is_some());
        assert!(registry.private_key(2).is_none());
        assert!(KeyRegistry::<PrivateKeyOnly>::empty().private_key(0).is_none());
    }

    #[test]
    fn private_only_registry() {
        let mut rng = StdRng::seed_from_u64(3);
        let registry = KeyRegistry::random(1, &mut rng);
        let private_only = KeyRegistry::<PrivateKeyOnly>::from(&registry);

        assert_eq!(
            registry.private_key(0).unwrap().to_bytes(),
            private_only.private_key(0).unwrap().to_bytes()
        );
    }

    #[test]
    fn key_bytes() {
        let mut rng = StdRng::seed_from_u64(4);
        let keypair = KeyPair::generate(&mut rng);
        assert_eq!(32, keypair.pk_bytes().len());
        assert_eq!(32, keypair.sk_bytes().len());
        assert_ne!(keypair.pk_bytes(), keypair.sk_bytes());
    }

    #[test]
    fn debug_hides_keys() {
        let mut rng = StdRng::seed_from_u64(5);
        let registry = KeyRegistry::random(2, &mut rng);
        let sk_hex = hex::encode(registry.private_key(0).unwrap().to_bytes());

        let debug = format!("{:?}", KeyRegistry::<PrivateKeyOnly>::from(&registry));
        assert_eq!("KeyRegistry { keys: 2, .. }", debug);
        assert!(!debug.contains(&sk_hex));
    }
}
