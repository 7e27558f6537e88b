use std::io::stdout;

use clap::{Parser, Subcommand};
use ipa_matchkey::{
    cli::{
        Verbosity,
        crypto::{DecryptArgs, EncryptArgs, KeygenArgs},
    },
    error::BoxError,
};

#[derive(Debug, Parser)]
#[clap(name = "matchkey-util", about = "Match key sharing and encryption CLI")]
#[command(about)]
struct Args {
    #[clap(flatten)]
    logging: Verbosity,

    #[command(subcommand)]
    action: MatchKeyUtilCommand,
}

#[derive(Debug, Subcommand)]
enum MatchKeyUtilCommand {
    Keygen(KeygenArgs),
    Encrypt(EncryptArgs),
    Decrypt(DecryptArgs),
}

fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    args.logging.setup_logging();

    match args.action {
        MatchKeyUtilCommand::Keygen(keygen_args) => keygen_args.keygen(&mut stdout())?,
        MatchKeyUtilCommand::Encrypt(encrypt_args) => encrypt_args.encrypt()?,
        MatchKeyUtilCommand::Decrypt(decrypt_args) => {
            for report in decrypt_args.decrypt()? {
                println!("{report:?}");
            }
        }
    }
    Ok(())
}
