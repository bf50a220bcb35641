//! Structured logging.
//!
//! `RUST_LOG` wins when set; otherwise the crate and request traces log at
//! info. JSON output is for log shippers, pretty output for terminals.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

pub const DEFAULT_FILTER: &str = "quoteversation=info,tower_http=info";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Later calls are ignored, so tests and
/// embedding processes may call this more than once.
pub fn init_tracing(format: LogFormat) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if result.is_ok() {
        tracing::debug!(?format, "tracing initialised");
    }
}
