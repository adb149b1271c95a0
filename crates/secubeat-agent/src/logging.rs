//! Logging initialization.

use secubeat_config::SecubeatConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing from the merged configuration.
///
/// `SECUBEAT_LOG` (or `RUST_LOG`) overrides the configured level with a
/// full filter directive.
pub fn init(config: &SecubeatConfig) {
    let filter = EnvFilter::try_from_env("SECUBEAT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&config.monitor.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    // A second init (tests, embedding) is not an error worth dying for.
    let _ = subscriber.try_init();
}
