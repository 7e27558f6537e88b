use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use clap::Parser;

use crate::{
    config::{DEFAULT_HELPER_DOMAIN, HpkeServerConfig, hpke_registry},
    error::BoxError,
    hpke::HpkeSealer,
    report::{MatchKeyReport, decrypt_blob},
};

#[derive(Debug, Parser)]
#[clap(name = "decrypt", about = "Decrypt match key shares")]
#[command(about)]
pub struct DecryptArgs {
    /// Path to file with hex-encoded encrypted reports, one per line
    #[arg(long)]
    input_file: PathBuf,
    /// Path to file with the hex-encoded private key of the helper
    #[arg(long)]
    private_key: PathBuf,
    /// Domain of the helper the reports were encrypted for
    #[arg(long, default_value = DEFAULT_HELPER_DOMAIN)]
    helper_domain: String,
}

impl DecryptArgs {
    #[must_use]
    pub fn new(input_file: &Path, private_key: &Path, helper_domain: &str) -> Self {
        Self {
            input_file: input_file.to_path_buf(),
            private_key: private_key.to_path_buf(),
            helper_domain: helper_domain.to_owned(),
        }
    }

    /// Decrypts every report in the input file. Blank lines are skipped.
    ///
    /// # Errors
    /// If any of the files cannot be read, the key is malformed or a report does not decrypt.
    pub fn decrypt(&self) -> Result<Vec<MatchKeyReport>, BoxError> {
        let key_registry = hpke_registry(Some(&HpkeServerConfig::File {
            private_key_file: self.private_key.clone(),
        }))?;

        let reader = BufReader::new(File::open(&self.input_file).map_err(|e| {
            format!("unable to open {}: {e}", self.input_file.display())
        })?);

        let mut reports = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let blob = hex::decode(line.trim())?;
            let report = decrypt_blob(&blob, &self.helper_domain, &key_registry, &HpkeSealer)
                .map_err(|e| format!("report on line {}: {e}", line_no + 1))?;
            reports.push(report);
        }

        Ok(reports)
    }
}
