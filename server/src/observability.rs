//! Logging setup and the central error sink.

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LogFormat};

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "warden_server=debug,sqlx=warn";

/// Install the global tracing subscriber.
///
/// Returns `false` if a subscriber was already installed (tests, embedding
/// applications), in which case the existing one is kept.
pub fn init_tracing(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let result = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    };

    result.is_ok()
}

/// Report an unexpected failure.
///
/// This is the single place where internal errors leave the process; the
/// chat only ever sees a generic message.
pub fn report_error(context: &str, error: &(dyn std::error::Error + 'static)) {
    let mut chain = Vec::new();
    let mut source = error.source();
    while let Some(inner) = source {
        chain.push(inner.to_string());
        source = inner.source();
    }
    tracing::error!(context, error = %error, causes = ?chain, "Unhandled error");
}
