use std::sync::Once;

/// Set up logging for tests
///
/// ## Panics
/// Does not, but compiler cannot be convinced otherwise
pub fn setup() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        use std::str::FromStr;

        use tracing::Level;
        use tracing_subscriber::{
            EnvFilter, filter::Directive, fmt, fmt::format::FmtSpan, layer::SubscriberExt,
            util::SubscriberInitExt,
        };

        let default_directive = if let Some(crate_name) = option_env!("CARGO_CRATE_NAME") {
            // only print this crate's logging by default
            Directive::from_str(&format!("{crate_name}=INFO")).unwrap()
        } else {
            Level::INFO.into()
        };

        tracing_subscriber::registry()
            .with(
                EnvFilter::builder()
                    .with_default_directive(default_directive)
                    .from_env_lossy(),
            )
            .with(
                fmt::layer()
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_test_writer(),
            )
            .init();
    });
}
