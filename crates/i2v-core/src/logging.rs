//! Logging initialization for applications embedding i2v.
//!
//! The library itself only emits `tracing` events; call one of these once at
//! startup to install a subscriber.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install a global subscriber writing to stderr.
///
/// `verbose` selects DEBUG instead of INFO; `RUST_LOG` overrides both.
/// `json_format` switches from human-readable to JSON lines. Fails if a
/// global subscriber is already installed.
pub fn init(verbose: bool, json_format: bool) -> Result<(), TryInitError> {
    let default_level = if verbose { "debug" } else { "info" };
    init_with_level(default_level, json_format)
}

/// Install a subscriber from [`LoggingConfig`], with an optional verbose
/// override.
pub fn init_from_config(config: &LoggingConfig, verbose_override: bool) -> Result<(), TryInitError> {
    let level = if verbose_override {
        "debug"
    } else {
        config.level.as_str()
    };
    init_with_level(level, config.format == "json")
}

fn init_with_level(level: &str, json_format: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .try_init()
    }
}
