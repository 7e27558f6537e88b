use std::{
    borrow::Cow,
    fmt::{Debug, Formatter},
    path::PathBuf,
};

use serde::Deserialize;

use crate::{
    error::Error,
    helpers::HelperIdentity,
    hpke::{
        Deserializable as _, IpaPrivateKey, IpaPublicKey, KeyRegistry, PrivateKeyOnly,
        Serializable as _,
    },
};

/// Domain every helper of the test network is reachable at.
pub const DEFAULT_HELPER_DOMAIN: &str = "github.com/private-attribution";

/// Public keys of the test network, ordered by helper identity.
const BUILTIN_PUBLIC_KEYS: [&str; 3] = [
    "92a6fb666c37c008defd74abf3204ebea685742eab8347b08e2f7c759893947a",
    "cfdbaaff16b30aa8a4ab07eaad2cdd80458208a1317aefbb807e46dce596617e",
    "b900be35da06106a83ed73c33f733e03e4ea5888b7ea4c912ab270b0b0f8381e",
];

/// Everything a device needs to know about one helper in order to encrypt a match key share
/// towards it.
#[derive(Clone, Debug)]
pub struct HelperConfig {
    /// Helper domain, authenticated as part of HPKE `info`.
    pub domain: String,

    /// Match key encryption configuration.
    pub hpke_config: HpkeClientConfig,
}

impl HelperConfig {
    #[must_use]
    pub fn public_key(&self) -> &IpaPublicKey {
        &self.hpke_config.public_key
    }

    #[must_use]
    pub fn public_key_hex(&self) -> String {
        pk_to_str(&self.hpke_config.public_key)
    }
}

/// Match key encryption client configuration. To encrypt match keys towards a helper node, clients
/// need to know helper's public key.
#[derive(Clone)]
pub struct HpkeClientConfig {
    pub public_key: IpaPublicKey,
}

impl Debug for HpkeClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HpkeClientConfig")
            .field("public_key", &pk_to_str(&self.public_key))
            .finish()
    }
}

impl HpkeClientConfig {
    #[must_use]
    pub fn new(public_key: IpaPublicKey) -> Self {
        Self { public_key }
    }
}

/// Static mapping from helper identity to its public key and domain. It is built once at startup
/// and passed by reference to whoever needs to encrypt towards helpers.
#[derive(Clone, Debug)]
pub struct HelperRegistry {
    helpers: Vec<HelperConfig>,
}

#[derive(Deserialize)]
struct RawRegistry {
    helpers: Vec<RawHelper>,
}

#[derive(Deserialize)]
struct RawHelper {
    domain: String,
    hpke: RawHpke,
}

#[derive(Deserialize)]
struct RawHpke {
    public_key: String,
}

impl HelperRegistry {
    /// Creates a registry from the configurations of helpers one, two and three, in that order.
    #[must_use]
    pub fn new(helpers: [HelperConfig; 3]) -> Self {
        Self {
            helpers: helpers.to_vec(),
        }
    }

    /// Registry of the test network: the hardcoded helper keys, all served from
    /// [`DEFAULT_HELPER_DOMAIN`].
    ///
    /// ## Panics
    /// If the builtin keys are not valid X25519 public keys, which would be a bug.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            helpers: BUILTIN_PUBLIC_KEYS
                .iter()
                .map(|pk| HelperConfig {
                    domain: DEFAULT_HELPER_DOMAIN.to_owned(),
                    hpke_config: HpkeClientConfig::new(pk_from_str(pk).unwrap()),
                })
                .collect(),
        }
    }

    /// Parses the registry from TOML:
    ///
    /// ```toml
    /// [[helpers]]
    /// domain = "github.com/private-attribution"
    /// [helpers.hpke]
    /// public_key = "92a6fb666c37c008defd74abf3204ebea685742eab8347b08e2f7c759893947a"
    /// ```
    ///
    /// Exactly three `helpers` entries are required, for helpers one, two and three.
    ///
    /// ## Errors
    /// If the input is not valid TOML, a public key is not hex-encoded, is not a valid X25519
    /// key or the number of helpers is not three.
    pub fn from_toml_str(input: &str) -> Result<Self, Error> {
        let raw: RawRegistry = toml::from_str(input)?;
        if raw.helpers.len() != 3 {
            return Err(Error::Config(format!(
                "expected configuration for 3 helpers, found {}",
                raw.helpers.len()
            )));
        }

        let helpers = raw
            .helpers
            .into_iter()
            .map(|helper| {
                Ok(HelperConfig {
                    domain: helper.domain,
                    hpke_config: HpkeClientConfig::new(pk_from_str(&helper.hpke.public_key)?),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self { helpers })
    }

    /// ## Errors
    /// If the registry has no configuration for `identity`.
    pub fn lookup(&self, identity: HelperIdentity) -> Result<&HelperConfig, Error> {
        usize::from(u8::from(identity))
            .checked_sub(1)
            .and_then(|index| self.helpers.get(index))
            .ok_or_else(|| Error::Config(format!("{identity} is not a known helper")))
    }
}

/// ## Errors
/// [`Error::HexDecode`] if `s` is not hex, [`Error::Config`] if it does not encode a valid X25519
/// public key, including keys of the wrong length.
pub fn pk_from_str(s: &str) -> Result<IpaPublicKey, Error> {
    let buf = hex::decode(s.trim())?;

    IpaPublicKey::from_bytes(&buf).map_err(|e| {
        Error::Config(format!(
            "invalid public key ({} bytes): {e}",
            buf.len()
        ))
    })
}

fn pk_to_str(pk: &IpaPublicKey) -> String {
    hex::encode(pk.to_bytes().as_slice())
}

/// Where a helper finds the secret key that opens match key ciphertexts.
#[derive(Clone, Debug)]
pub enum HpkeServerConfig {
    File {
        /// Path to file containing private key which decrypts match keys
        private_key_file: PathBuf,
    },
    Inline {
        // Private key in hex format
        private_key: String,
    },
}

/// Loads the helper's secret key into a registry under [`DEFAULT_KEY_ID`].
///
/// ## Errors
/// If the key file cannot be read or it does not contain a hex-encoded X25519 private key.
///
/// [`DEFAULT_KEY_ID`]: crate::report::DEFAULT_KEY_ID
pub fn hpke_registry(
    config: Option<&HpkeServerConfig>,
) -> Result<KeyRegistry<PrivateKeyOnly>, Error> {
    let sk_str = match config {
        None => return Ok(KeyRegistry::<PrivateKeyOnly>::empty()),
        Some(HpkeServerConfig::Inline { private_key }) => Cow::Borrowed(private_key.trim()),
        Some(HpkeServerConfig::File { private_key_file }) => {
            Cow::Owned(std::fs::read_to_string(private_key_file)?.trim().to_owned())
        }
    };

    let sk = hex::decode(sk_str.as_ref())?;

    Ok(KeyRegistry::from_keys([PrivateKeyOnly(
        IpaPrivateKey::from_bytes(&sk)
            .map_err(|e| Error::Config(format!("invalid private key: {e}")))?,
    )]))
}
