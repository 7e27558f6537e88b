use std::{
    fs::{OpenOptions, read_to_string},
    io::Write,
    iter::zip,
    path::{Path, PathBuf},
};

use clap::Parser;
use rand::thread_rng;

use crate::{
    config::HelperRegistry,
    error::BoxError,
    helpers::HelperIdentity,
    hpke::HpkeSealer,
    report::{DEFAULT_KEY_ID, EventType, KeyIdentifier, encrypt_match_key},
    secret_sharing::MatchKey,
};

fn parse_match_key(s: &str) -> Result<MatchKey, String> {
    match s.strip_prefix("0x") {
        Some(hex) => MatchKey::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("{s} is not a valid match key: {e}"))
}

#[derive(Debug, Parser)]
#[clap(name = "encrypt", about = "Secret share and encrypt a match key")]
#[command(about)]
pub struct EncryptArgs {
    /// Match key to secret share, decimal or `0x`-prefixed hex
    #[arg(long, value_parser = parse_match_key)]
    match_key: MatchKey,
    /// Site domain the match key is bound to
    #[arg(long)]
    site_domain: String,
    #[arg(long, default_value_t = EventType::Source)]
    event_type: EventType,
    #[arg(long, default_value_t = DEFAULT_KEY_ID)]
    key_id: KeyIdentifier,
    /// Path to helper registry configuration file. Builtin helper keys are used if not set
    #[arg(long)]
    registry: Option<PathBuf>,
    /// The destination dir for encrypted output.
    /// In that dir, it will create helper1.enc,
    /// helper2.enc, and helper3.enc
    #[arg(long, value_name = "FILE")]
    output_dir: PathBuf,
}

impl EncryptArgs {
    #[must_use]
    pub fn new(
        match_key: MatchKey,
        site_domain: &str,
        event_type: EventType,
        registry: Option<&Path>,
        output_dir: &Path,
    ) -> Self {
        Self {
            match_key,
            site_domain: site_domain.to_owned(),
            event_type,
            key_id: DEFAULT_KEY_ID,
            registry: registry.map(Path::to_path_buf),
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// # Errors
    /// If the registry file cannot be read or parsed, encryption fails or output files cannot
    /// be created. Existing files are never overwritten.
    pub fn encrypt(&self) -> Result<(), BoxError> {
        let registry = match &self.registry {
            Some(path) => HelperRegistry::from_toml_str(&read_to_string(path).map_err(|e| {
                format!("Failed to open registry file: {}. {e}", path.display())
            })?)?,
            None => HelperRegistry::builtin(),
        };

        let blobs = encrypt_match_key(
            self.match_key,
            self.event_type,
            &self.site_domain,
            self.key_id,
            &registry,
            &HpkeSealer,
            &mut thread_rng(),
        )?;

        let paths = HelperIdentity::make_three().map(|identity| {
            self.output_dir.join(format!("{identity}.enc"))
        });

        // all three files are created before anything is written, so an existing file leaves
        // the output directory as it was.
        let mut writers = Vec::with_capacity(paths.len());
        for path in &paths {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(file) => writers.push(file),
                Err(e) => {
                    remove_all(&paths[..writers.len()]);
                    return Err(format!("unable to write to {}. {e}", path.display()).into());
                }
            }
        }

        for (mut writer, blob) in zip(writers, blobs) {
            if let Err(e) = writeln!(writer, "{}", hex::encode(&blob)) {
                remove_all(&paths);
                return Err(e.into());
            }
        }

        Ok(())
    }
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("failed to remove {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use tempfile::{NamedTempFile, tempdir};

    use super::{EncryptArgs, parse_match_key};
    use crate::report::EventType;

    #[test]
    fn match_key_formats() {
        assert_eq!(Ok(0x0102_0304_0506_0708), parse_match_key("0x0102030405060708"));
        assert_eq!(Ok(42), parse_match_key("42"));
        assert!(parse_match_key("0xzz").is_err());
        assert!(parse_match_key("-1").is_err());
    }

    #[test]
    fn parse_args() {
        let args = EncryptArgs::try_parse_from([
            "encrypt",
            "--match-key",
            "0x10",
            "--site-domain",
            "www.meta.com",
            "--event-type",
            "Trigger",
            "--output-dir",
            "/tmp",
        ])
        .unwrap();
        assert_eq!(16, args.match_key);
        assert_eq!(EventType::Trigger, args.event_type);
        assert_eq!(0, args.key_id);
        assert!(args.registry.is_none());
    }

    #[test]
    fn writes_three_files() {
        let output_dir = tempdir().unwrap();
        EncryptArgs::new(1, "www.meta.com", EventType::Source, None, output_dir.path())
            .encrypt()
            .unwrap();

        for i in 1..=3 {
            let contents =
                std::fs::read_to_string(output_dir.path().join(format!("helper{i}.enc"))).unwrap();
            let blob = hex::decode(contents.trim()).unwrap();
            assert_eq!(68 + "www.meta.com".len(), blob.len());
        }
    }

    #[test]
    fn does_not_overwrite() {
        let output_dir = tempdir().unwrap();
        let args = EncryptArgs::new(1, "www.meta.com", EventType::Source, None, output_dir.path());
        args.encrypt().unwrap();
        assert!(args.encrypt().is_err());
    }

    #[test]
    fn existing_file_leaves_no_partial_output() {
        let output_dir = tempdir().unwrap();
        std::fs::write(output_dir.path().join("helper3.enc"), "existing").unwrap();

        let err = EncryptArgs::new(1, "www.meta.com", EventType::Source, None, output_dir.path())
            .encrypt()
            .unwrap_err();
        assert!(err.to_string().contains("helper3.enc"), "{err}");

        assert!(!output_dir.path().join("helper1.enc").exists());
        assert!(!output_dir.path().join("helper2.enc").exists());
        assert_eq!(
            "existing",
            std::fs::read_to_string(output_dir.path().join("helper3.enc")).unwrap()
        );
    }

    #[test]
    fn no_registry_file() {
        let output_dir = tempdir().unwrap();
        let registry = output_dir.path().join("does_not_exist");
        let err = EncryptArgs::new(1, "a.com", EventType::Source, Some(&registry), output_dir.path())
            .encrypt()
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to open registry file"));
    }

    #[test]
    fn bad_registry_file() {
        let output_dir = tempdir().unwrap();
        let mut registry = NamedTempFile::new().unwrap();
        writeln!(
            registry.as_file_mut(),
            "this is not toml!\n%^& weird characters"
        )
        .unwrap();

        assert!(
            EncryptArgs::new(1, "a.com", EventType::Source, Some(registry.path()), output_dir.path())
                .encrypt()
                .is_err()
        );
        assert!(!output_dir.path().join("helper1.enc").exists());
    }
}
