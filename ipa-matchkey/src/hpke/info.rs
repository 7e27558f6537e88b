use typenum::Unsigned;

use crate::{
    ff::{Serializable, put_terminated_str},
    report::{Epoch, EventType, KeyIdentifier},
};

const DOMAIN: &str = "private-attribution";

/// Represents the [`info`] part of the receiver context, that is: application specific data
/// for each encryption.
///
/// Match key encryption is authenticated with the key identifier, key epoch, event type, helper
/// domain and site domain. Sender and receiver must produce byte-identical `info` or opening the
/// ciphertext fails.
///
/// These bytes are the associated data of a match key ciphertext. They enter HPKE as the key
/// schedule `info` input, not as AEAD additional data, which is always empty. A receiver must
/// pass them the same way.
///
/// [`info`]: https://www.rfc-editor.org/rfc/rfc9180.html#name-creating-the-encryption-con
#[derive(Clone, Debug)]
pub struct Info<'a> {
    pub(super) key_id: KeyIdentifier,
    pub(super) epoch: Epoch,
    pub(super) event_type: EventType,
    pub(super) helper_domain: &'a str,
    pub(super) site_domain: &'a str,
}

impl<'a> Info<'a> {
    #[must_use]
    pub fn new(
        key_id: KeyIdentifier,
        epoch: Epoch,
        event_type: EventType,
        helper_domain: &'a str,
        site_domain: &'a str,
    ) -> Self {
        Self {
            key_id,
            epoch,
            event_type,
            helper_domain,
            site_domain,
        }
    }

    /// Converts this instance into an owned byte slice that can further be used to create HPKE
    /// sender or receiver context.
    ///
    /// Layout: `"private-attribution" 0x00 helper_domain 0x00 site_domain 0x00 key_id epoch
    /// event_type`, with `epoch` in little-endian and `event_type` as a single byte.
    #[must_use]
    pub fn to_bytes(&self) -> Box<[u8]> {
        let info_len = DOMAIN.len()
            + self.helper_domain.len()
            + self.site_domain.len()
            + 3 // account for 3 delimiters
            + <KeyIdentifier as Serializable>::Size::USIZE
            + <Epoch as Serializable>::Size::USIZE
            + <EventType as Serializable>::Size::USIZE;
        let mut r = Vec::with_capacity(info_len);

        put_terminated_str(&mut r, DOMAIN);
        put_terminated_str(&mut r, self.helper_domain);
        put_terminated_str(&mut r, self.site_domain);

        self.key_id.write_to(&mut r);
        self.epoch.write_to(&mut r);
        self.event_type.write_to(&mut r);

        debug_assert_eq!(
            r.len(),
            info_len,
            "HPKE Info length estimation is incorrect and leads to extra allocation or wasted memory"
        );

        r.into_boxed_slice()
    }
}
