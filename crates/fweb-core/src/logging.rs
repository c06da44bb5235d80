#![forbid(unsafe_code)]

//! Subscriber setup for structured logging.
//!
//! All crates emit `tracing` events unconditionally; this module only decides
//! where they go. The filter comes from `FWEB_LOG` (same syntax as
//! `RUST_LOG`) and defaults to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "FWEB_LOG";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    #[cfg(feature = "logging-json")]
    Json,
}

/// Install a global subscriber with the default format.
///
/// Returns `false` when another subscriber was already installed.
pub fn init() -> bool {
    init_with(LogFormat::default())
}

pub fn init_with(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
        #[cfg(feature = "logging-json")]
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init(),
    };
    installed.is_ok()
}
