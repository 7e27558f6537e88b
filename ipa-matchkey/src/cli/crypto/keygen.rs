use std::io::Write;

use clap::Parser;
use rand::thread_rng;

use crate::{error::BoxError, hpke::KeyPair};

#[derive(Debug, Parser)]
#[clap(name = "keygen", about = "Generate match key encryption keys")]
#[command(about)]
pub struct KeygenArgs {}

impl KeygenArgs {
    /// Generates a fresh X25519 key pair and writes both halves, hex-encoded, to `out`. The
    /// public key goes into a helper registry, the private key is handed to the helper.
    ///
    /// # Errors
    /// If writing to `out` fails.
    pub fn keygen<W: Write>(&self, out: &mut W) -> Result<(), BoxError> {
        let keypair = KeyPair::generate(&mut thread_rng());

        writeln!(out, "public_key = \"{}\"", hex::encode(keypair.pk_bytes()))?;
        writeln!(out, "private_key = \"{}\"", hex::encode(keypair.sk_bytes()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hpke::{Deserializable, Kem, Serializable};

    use super::KeygenArgs;
    use crate::{
        config::pk_from_str,
        hpke::{IpaKem, IpaPrivateKey},
    };

    #[test]
    fn keys_match() {
        let mut out = Vec::new();
        KeygenArgs {}.keygen(&mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        let values = out
            .lines()
            .map(|line| line.split('"').nth(1).unwrap())
            .collect::<Vec<_>>();
        let [pk, sk] = values.as_slice() else {
            panic!("expected two keys, got {out}");
        };

        let pk = pk_from_str(pk).unwrap();
        let sk = IpaPrivateKey::from_bytes(&hex::decode(sk).unwrap()).unwrap();
        assert_eq!(pk.to_bytes(), IpaKem::sk_to_pk(&sk).to_bytes());
    }
}
