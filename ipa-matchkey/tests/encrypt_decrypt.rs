use std::{io::Write, iter::zip};

use ipa_matchkey::{
    config::{DEFAULT_HELPER_DOMAIN, HelperRegistry, HpkeServerConfig, hpke_registry},
    error::Error,
    helpers::HelperIdentity,
    hpke::{EncryptedEnvelope, HpkeSealer, Info, KeyRegistry, PrivateKeyOnly, Sealer},
    report::{
        DEFAULT_EPOCH, DEFAULT_KEY_ID, EncryptedMatchKeyReport, EventType, FieldLengths,
        MatchKeyReport, decrypt_blob, encrypt_match_key,
    },
    secret_sharing::{IntoShares, MatchKey, Reconstruct, Share},
};
use rand::{SeedableRng, rngs::StdRng};
use tempfile::NamedTempFile;

const MATCH_KEY: MatchKey = 0x0102_0304_0506_0708;
const SITE_DOMAIN: &str = "www.meta.com";

/// Key pairs of the builtin helper registry, in helper order.
const KEYS: [(&str, &str); 3] = [
    (
        "92a6fb666c37c008defd74abf3204ebea685742eab8347b08e2f7c759893947a",
        "53d58e022981f2edbf55fec1b45dbabd08a3442cb7b7c598839de5d7a5888bff",
    ),
    (
        "cfdbaaff16b30aa8a4ab07eaad2cdd80458208a1317aefbb807e46dce596617e",
        "3a0a993a3cfc7e8d381addac586f37de50c2a14b1a6356d71e94ca2afaeb2569",
    ),
    (
        "b900be35da06106a83ed73c33f733e03e4ea5888b7ea4c912ab270b0b0f8381e",
        "1fb5c5274bf85fbe6c7935684ef05499f6cfb89ac21640c28330135cc0e8a0f7",
    ),
];

fn key_registry(sk: &str) -> KeyRegistry<PrivateKeyOnly> {
    hpke_registry(Some(&HpkeServerConfig::Inline {
        private_key: sk.to_owned(),
    }))
    .unwrap()
}

fn registry_file(domains: [&str; 3]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for (domain, (pk, _)) in zip(domains, KEYS) {
        writeln!(
            file,
            "[[helpers]]\ndomain = \"{domain}\"\n[helpers.hpke]\npublic_key = \"{pk}\""
        )
        .unwrap();
    }
    file.flush().unwrap();

    file
}

#[test]
fn share_zero_decrypts_for_helper_one() {
    let mut rng = StdRng::seed_from_u64(42);
    let shares: [Share; 3] = MATCH_KEY.share_with(&mut rng).unwrap();
    let registry = HelperRegistry::builtin();
    let helper = registry.lookup(HelperIdentity::ONE).unwrap();
    assert_eq!(KEYS[0].0, helper.public_key_hex());

    let report = MatchKeyReport {
        match_key: shares[0],
        event_type: EventType::Source,
        epoch: DEFAULT_EPOCH,
        site_domain: SITE_DOMAIN.to_owned(),
    };
    let blob = report
        .encrypt(DEFAULT_KEY_ID, helper, &HpkeSealer, &mut rng)
        .unwrap();

    let decrypted =
        decrypt_blob(&blob, DEFAULT_HELPER_DOMAIN, &key_registry(KEYS[0].1), &HpkeSealer).unwrap();
    assert_eq!(shares[0].left(), decrypted.match_key.left());
    assert_eq!(shares[0].right(), decrypted.match_key.right());
    assert_eq!(report, decrypted);
}

#[test]
fn other_site_domain_fails_to_open() {
    let mut rng = StdRng::seed_from_u64(43);
    let blobs = encrypt_match_key(
        MATCH_KEY,
        EventType::Source,
        SITE_DOMAIN,
        DEFAULT_KEY_ID,
        &HelperRegistry::builtin(),
        &HpkeSealer,
        &mut rng,
    )
    .unwrap();

    let report =
        EncryptedMatchKeyReport::from_bytes(blobs[0].as_slice(), FieldLengths::MATCH_KEY).unwrap();
    let info = Info::new(
        report.key_id(),
        report.epoch(),
        report.event_type(),
        DEFAULT_HELPER_DOMAIN,
        "other.com",
    );
    let envelope = EncryptedEnvelope {
        encapsulated_key: report.encap_key_mk().to_vec(),
        ciphertext: report.mk_ciphertext().to_vec(),
        info: info.to_bytes(),
    };
    let key_registry = key_registry(KEYS[0].1);
    let sk = ipa_matchkey::hpke::PrivateKeyRegistry::private_key(&key_registry, DEFAULT_KEY_ID)
        .unwrap();
    assert!(HpkeSealer.open(sk, &envelope).is_err());

    let mut rewritten = blobs[0][..blobs[0].len() - SITE_DOMAIN.len()].to_vec();
    rewritten.extend_from_slice(b"other.com");
    assert!(matches!(
        decrypt_blob(&rewritten, DEFAULT_HELPER_DOMAIN, &key_registry, &HpkeSealer),
        Err(Error::AuthenticationFailed)
    ));
}

#[test]
fn helpers_from_config_file() {
    let mut rng = StdRng::seed_from_u64(44);
    let domains = ["helper1.test", "helper2.test", "helper3.test"];
    let file = registry_file(domains);
    let registry =
        HelperRegistry::from_toml_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();

    let blobs = encrypt_match_key(
        MATCH_KEY,
        EventType::Trigger,
        SITE_DOMAIN,
        DEFAULT_KEY_ID,
        &registry,
        &HpkeSealer,
        &mut rng,
    )
    .unwrap();

    let mut shares = Vec::new();
    for (blob, (domain, (_, sk))) in zip(&blobs, zip(domains, KEYS)) {
        let key_registry = key_registry(sk);
        assert!(matches!(
            decrypt_blob(blob, DEFAULT_HELPER_DOMAIN, &key_registry, &HpkeSealer),
            Err(Error::AuthenticationFailed)
        ));

        let report = decrypt_blob(blob, domain, &key_registry, &HpkeSealer).unwrap();
        assert_eq!(EventType::Trigger, report.event_type);
        shares.push(report.match_key);
    }

    let shares: [Share; 3] = shares.try_into().unwrap();
    assert_eq!(MATCH_KEY, shares.reconstruct().unwrap());
    assert_eq!(MATCH_KEY, [shares[2], shares[0]].reconstruct().unwrap());
}

#[test]
fn blobs_are_not_interchangeable() {
    let mut rng = StdRng::seed_from_u64(45);
    let blobs = encrypt_match_key(
        MATCH_KEY,
        EventType::Source,
        SITE_DOMAIN,
        DEFAULT_KEY_ID,
        &HelperRegistry::builtin(),
        &HpkeSealer,
        &mut rng,
    )
    .unwrap();

    for (i, (_, sk)) in KEYS.iter().enumerate() {
        let key_registry = key_registry(sk);
        for (j, blob) in blobs.iter().enumerate() {
            let result = decrypt_blob(blob, DEFAULT_HELPER_DOMAIN, &key_registry, &HpkeSealer);
            assert_eq!(i == j, result.is_ok(), "helper {i} blob {j}");
        }
    }
}

#[test]
fn malformed_blob() {
    let key_registry = key_registry(KEYS[0].1);
    for blob in [&[][..], &[0; 67][..]] {
        assert!(matches!(
            decrypt_blob(blob, DEFAULT_HELPER_DOMAIN, &key_registry, &HpkeSealer),
            Err(Error::MalformedInput(_))
        ));
    }
}
