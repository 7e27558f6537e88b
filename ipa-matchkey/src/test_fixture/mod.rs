//! Helpers shared by unit and integration tests. Enabled with the `test-fixture` feature.

pub mod logging;
mod sealer;

use rand_core::{CryptoRng, RngCore};
pub use sealer::{FailingSealer, FakeSealer};

use crate::{
    config::{HelperConfig, HelperRegistry, HpkeClientConfig, HpkeServerConfig, hpke_registry},
    hpke::{KeyPair, KeyRegistry, PrivateKeyOnly},
};

/// Private key that matches the first of the builtin helper public keys.
pub const HELPER1_PRIVATE_KEY: &str =
    "53d58e022981f2edbf55fec1b45dbabd08a3442cb7b7c598839de5d7a5888bff";

/// Key registry holding a single hex-encoded private key under the default key id.
///
/// ## Panics
/// If `private_key` is not a valid hex-encoded X25519 key.
#[must_use]
pub fn helper_key_registry(private_key: &str) -> KeyRegistry<PrivateKeyOnly> {
    hpke_registry(Some(&HpkeServerConfig::Inline {
        private_key: private_key.to_owned(),
    }))
    .unwrap()
}

/// Generates a fresh key pair for each of the three helpers. Helper `i` is served from
/// `helper{i}.test`. Returns the registry a device would use, along with each helper's own key
/// registry.
pub fn test_helpers<R: RngCore + CryptoRng>(
    rng: &mut R,
) -> (HelperRegistry, [KeyRegistry<KeyPair>; 3]) {
    let keys: [KeyPair; 3] = std::array::from_fn(|_| KeyPair::generate(rng));
    let configs = std::array::from_fn(|i| HelperConfig {
        domain: format!("helper{}.test", i + 1),
        hpke_config: HpkeClientConfig::new(keys[i].public_key().clone()),
    });

    (
        HelperRegistry::new(configs),
        keys.map(|keypair| KeyRegistry::from_keys([keypair])),
    )
}
