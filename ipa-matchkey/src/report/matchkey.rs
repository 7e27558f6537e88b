use std::{fmt::Debug, iter::zip, ops::Deref};

use bytes::{BufMut, Bytes};
use generic_array::GenericArray;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, warn};
use typenum::Unsigned;

use crate::{
    config::{HelperConfig, HelperRegistry},
    error::Error,
    ff::{Serializable, str_from_tail},
    helpers::HelperIdentity,
    hpke::{
        CryptError, EncapsulationSize, EncryptedEnvelope, Info, PrivateKeyRegistry, Sealer,
        TagSize,
    },
    report::{DEFAULT_EPOCH, Epoch, EventType, InvalidReportError, KeyIdentifier},
    secret_sharing::{IntoShares, MatchKey, Share},
};

/// Lengths of the two variable-size fields that open an encrypted report. Nothing in the report
/// itself says where they end, so both sides must agree on them out of band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldLengths {
    pub encapsulated_key: usize,
    /// Ciphertext including the AEAD tag.
    pub ciphertext: usize,
}

impl FieldLengths {
    /// A sealed [`Share`] under the match key ciphersuite.
    pub const MATCH_KEY: Self = Self {
        encapsulated_key: EncapsulationSize::USIZE,
        ciphertext: <Share as Serializable>::Size::USIZE + TagSize::USIZE,
    };

    const fn event_type_offset(&self) -> usize {
        self.encapsulated_key + self.ciphertext
    }

    const fn key_id_offset(&self) -> usize {
        self.event_type_offset() + <EventType as Serializable>::Size::USIZE
    }

    const fn epoch_offset(&self) -> usize {
        self.key_id_offset() + <KeyIdentifier as Serializable>::Size::USIZE
    }

    const fn site_domain_offset(&self) -> usize {
        self.epoch_offset() + <Epoch as Serializable>::Size::USIZE
    }

    /// Minimum length of a valid report, or `None` if the field lengths do not fit in `usize`.
    /// Offsets are only computed once this returns `Some`.
    fn min_report_len(&self) -> Option<usize> {
        self.encapsulated_key
            .checked_add(self.ciphertext)?
            .checked_add(
                <EventType as Serializable>::Size::USIZE
                    + <KeyIdentifier as Serializable>::Size::USIZE
                    + <Epoch as Serializable>::Size::USIZE,
            )
    }
}

/// A binary report as received by a helper, containing one encrypted match key share.
/// An `EncryptedMatchKeyReport` consists of:
///     `ct_mk`: Enc(`match_key`)
///     associated data of `ct_mk`: `key_id`, `epoch`, `event_type`, `site_domain`
///
/// The helper domain is authenticated too, but it is not carried in the report. Each helper
/// supplies its own domain when decrypting.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedMatchKeyReport<B>
where
    B: Deref<Target = [u8]>,
{
    data: B,
    lengths: FieldLengths,
    event_type: EventType,
    key_id: KeyIdentifier,
    epoch: Epoch,
}

// Report structure:
//  * 0..a: `encap_key_mk`
//  * a..b: `mk_ciphertext`
//  * b: `event_type`
//  * b+1: `key_id`
//  * b+2..b+4: `epoch`
//  * b+4..: `site_domain`
impl<B> EncryptedMatchKeyReport<B>
where
    B: Deref<Target = [u8]>,
{
    pub fn encap_key_mk(&self) -> &[u8] {
        &self.data[..self.lengths.encapsulated_key]
    }

    pub fn mk_ciphertext(&self) -> &[u8] {
        &self.data[self.lengths.encapsulated_key..self.lengths.event_type_offset()]
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn key_id(&self) -> KeyIdentifier {
        self.key_id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// ## Panics
    /// Only if a `Report` constructor failed to validate the contents properly, which would be a bug.
    pub fn site_domain(&self) -> &str {
        str_from_tail(&self.data[self.lengths.site_domain_offset()..]).unwrap() // validated on construction
    }

    /// ## Errors
    /// If the report is shorter than the fixed-size fields, carries an unknown event type or the
    /// site domain is not UTF-8.
    pub fn from_bytes(bytes: B, lengths: FieldLengths) -> Result<Self, InvalidReportError> {
        let min_len = lengths.min_report_len().unwrap_or(usize::MAX);
        if bytes.len() < min_len {
            return Err(InvalidReportError::Length(bytes.len(), min_len));
        }

        let event_type = EventType::try_from(bytes[lengths.event_type_offset()])?;
        let key_id = bytes[lengths.key_id_offset()];
        let epoch = Epoch::read_from(&bytes[lengths.epoch_offset()..])
            .map_err(|e| InvalidReportError::DeserializationError("epoch", e.into()))?;
        str_from_tail(&bytes[lengths.site_domain_offset()..])
            .map_err(InvalidReportError::SiteDomain)?;

        Ok(Self {
            data: bytes,
            lengths,
            event_type,
            key_id,
            epoch,
        })
    }

    /// Decrypts the match key share. `helper_domain` is the domain of the helper performing the
    /// decryption, it must be the same domain the report was encrypted for.
    ///
    /// ## Errors
    /// If the match key share in the report cannot be decrypted (e.g. due to a
    /// failure of the authenticated encryption).
    pub fn decrypt<S: Sealer>(
        &self,
        helper_domain: &str,
        key_registry: &impl PrivateKeyRegistry,
        sealer: &S,
    ) -> Result<MatchKeyReport, InvalidReportError> {
        let info = Info::new(
            self.key_id,
            self.epoch,
            self.event_type,
            helper_domain,
            self.site_domain(),
        );
        let sk = key_registry
            .private_key(self.key_id)
            .ok_or(CryptError::NoSuchKey(self.key_id))?;

        let envelope = EncryptedEnvelope {
            encapsulated_key: self.encap_key_mk().to_vec(),
            ciphertext: self.mk_ciphertext().to_vec(),
            info: info.to_bytes(),
        };
        let plaintext_mk = sealer.open(sk, &envelope).inspect_err(|_| {
            warn!(
                key_id = self.key_id,
                epoch = self.epoch,
                site_domain = self.site_domain(),
                "match key share failed to authenticate"
            );
        })?;

        let expected = <Share as Serializable>::Size::USIZE;
        if plaintext_mk.len() != expected {
            return Err(InvalidReportError::DeserializationError(
                "matchkey",
                format!("expected {expected} bytes, got {}", plaintext_mk.len()).into(),
            ));
        }

        Ok(MatchKeyReport {
            match_key: Share::read_from(&plaintext_mk)
                .map_err(|e| InvalidReportError::DeserializationError("matchkey", e.into()))?,
            event_type: self.event_type,
            epoch: self.epoch,
            site_domain: self.site_domain().to_owned(),
        })
    }
}

impl<B: Deref<Target = [u8]>> Debug for EncryptedMatchKeyReport<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedMatchKeyReport")
            .field("encap_key_mk", &hex::encode(self.encap_key_mk()))
            .field("mk_ciphertext", &hex::encode(self.mk_ciphertext()))
            .field("event_type", &self.event_type)
            .field("key_id", &self.key_id)
            .field("epoch", &self.epoch)
            .field("site_domain", &self.site_domain())
            .finish()
    }
}

impl TryFrom<Bytes> for EncryptedMatchKeyReport<Bytes> {
    type Error = InvalidReportError;

    fn try_from(bytes: Bytes) -> Result<Self, InvalidReportError> {
        EncryptedMatchKeyReport::from_bytes(bytes, FieldLengths::MATCH_KEY)
    }
}

/// One helper's share of a match key together with the context it is encrypted under.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchKeyReport {
    pub match_key: Share,
    pub event_type: EventType,
    pub epoch: Epoch,
    pub site_domain: String,
}

impl MatchKeyReport {
    #[must_use]
    pub fn encrypted_len(&self) -> usize {
        FieldLengths::MATCH_KEY.site_domain_offset() + self.site_domain.len()
    }

    /// # Errors
    /// If there is a problem encrypting the report.
    pub fn encrypt<S: Sealer, R: CryptoRng + RngCore>(
        &self,
        key_id: KeyIdentifier,
        helper: &HelperConfig,
        sealer: &S,
        rng: &mut R,
    ) -> Result<Vec<u8>, InvalidReportError> {
        let mut out = Vec::with_capacity(self.encrypted_len());
        self.encrypt_to(key_id, helper, sealer, rng, &mut out)?;
        debug_assert_eq!(out.len(), self.encrypted_len());
        Ok(out)
    }

    /// # Errors
    /// If there is a problem encrypting the report.
    pub fn encrypt_to<S: Sealer, R: CryptoRng + RngCore, B: BufMut>(
        &self,
        key_id: KeyIdentifier,
        helper: &HelperConfig,
        sealer: &S,
        rng: &mut R,
        out: &mut B,
    ) -> Result<(), InvalidReportError> {
        let info = Info::new(
            key_id,
            self.epoch,
            self.event_type,
            &helper.domain,
            &self.site_domain,
        );

        let mut plaintext_mk = GenericArray::default();
        self.match_key.serialize(&mut plaintext_mk);

        let envelope = sealer.seal(helper.public_key(), &plaintext_mk, &info.to_bytes(), rng)?;
        if envelope.encapsulated_key.len() != FieldLengths::MATCH_KEY.encapsulated_key
            || envelope.ciphertext.len() != FieldLengths::MATCH_KEY.ciphertext
        {
            return Err(CryptError::Seal.into());
        }

        out.put_slice(&envelope.encapsulated_key);
        out.put_slice(&envelope.ciphertext);
        self.event_type.write_to(out);
        key_id.write_to(out);
        self.epoch.write_to(out);
        out.put_slice(self.site_domain.as_bytes());

        Ok(())
    }
}

/// Secret-shares `match_key` and encrypts one share towards each helper in `registry`. The
/// blob at index `i` is meant for helper `i + 1`.
///
/// Either all three blobs are produced or none is.
///
/// ## Errors
/// If the randomness source fails, a helper is missing from the registry or any share fails to
/// seal.
#[tracing::instrument(level = "debug", skip_all, fields(event_type = %event_type, site_domain = %site_domain, key_id = key_id))]
pub fn encrypt_match_key<S: Sealer, R: CryptoRng + RngCore>(
    match_key: MatchKey,
    event_type: EventType,
    site_domain: &str,
    key_id: KeyIdentifier,
    registry: &HelperRegistry,
    sealer: &S,
    rng: &mut R,
) -> Result<[Vec<u8>; 3], Error> {
    let shares = match_key.share_with(rng)?;
    let mut blobs: [Vec<u8>; 3] = Default::default();

    for (identity, share) in zip(HelperIdentity::make_three(), shares) {
        let helper = registry.lookup(identity)?;
        let report = MatchKeyReport {
            match_key: share,
            event_type,
            epoch: DEFAULT_EPOCH,
            site_domain: site_domain.to_owned(),
        };
        blobs[identity] = report.encrypt(key_id, helper, sealer, rng)?;
        debug!(helper = %identity, domain = %helper.domain, "sealed match key share");
    }

    Ok(blobs)
}

/// Parses and decrypts a report produced by [`encrypt_match_key`].
///
/// ## Errors
/// [`Error::MalformedInput`] if the blob cannot be parsed, [`Error::AuthenticationFailed`] if
/// it does not open under `helper_domain` and the registered key, [`Error::Config`] if the
/// report's key id is unknown.
pub fn decrypt_blob<S: Sealer>(
    blob: &[u8],
    helper_domain: &str,
    key_registry: &impl PrivateKeyRegistry,
    sealer: &S,
) -> Result<MatchKeyReport, Error> {
    let report = EncryptedMatchKeyReport::from_bytes(blob, FieldLengths::MATCH_KEY)?;
    debug!(?report, "decrypting match key share");

    Ok(report.decrypt(helper_domain, key_registry, sealer)?)
}
