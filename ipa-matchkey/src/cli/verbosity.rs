use std::io::{IsTerminal, stderr};

use clap::Parser;
use tracing::{Level, info, metadata::LevelFilter};
use tracing_subscriber::{
    EnvFilter, fmt, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Parser)]
pub struct Verbosity {
    /// Silence all output
    #[clap(short, long, global = true)]
    quiet: bool,

    /// Verbose mode (-v, or -vv for even more verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

impl Verbosity {
    /// Installs a global subscriber that writes to stderr. `RUST_LOG` takes precedence over the
    /// command line flags.
    ///
    /// ## Panics
    /// If a global subscriber has already been installed.
    pub fn setup_logging(&self) {
        let filter_layer = self.log_filter();
        let level = filter_layer.to_string();

        let fmt_layer = fmt::layer()
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_ansi(stderr().is_terminal())
            .with_writer(stderr);

        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();

        info!("Logging setup at level {level}");
    }

    fn log_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(
                if self.quiet {
                    LevelFilter::OFF
                } else {
                    LevelFilter::from_level(match self.verbose {
                        0 => Level::INFO,
                        1 => Level::DEBUG,
                        _ => Level::TRACE,
                    })
                }
                .into(),
            )
            .from_env_lossy()
    }
}
