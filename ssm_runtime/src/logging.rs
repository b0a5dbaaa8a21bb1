//! Structured logging setup using `tracing-subscriber`.
//!
//! Console-only, on stderr so stdout stays clean for the trace and
//! scoreboard. `RUST_LOG` wins over the configured level.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Initialise logging for the CLI.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_cli(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
