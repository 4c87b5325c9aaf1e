//! Structured logging infrastructure for the Canary engine.
//!
//! Centralized logging initialization with support for structured JSON
//! output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize logging from a [`LoggingConfig`].
///
/// `RUST_LOG` still takes precedence over the configured level. Output goes
/// to stderr so that report output on stdout stays machine-readable. Calling
/// this more than once is a no-op.
///
/// # Example
/// ```no_run
/// use canary_core::{logging, LoggingConfig};
///
/// logging::init_with(&LoggingConfig { json: true, ..LoggingConfig::default() });
/// tracing::info!(device_id = "canary-01", "Telemetry replay started");
/// ```
pub fn init_with(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(env_filter(&config.level));

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
