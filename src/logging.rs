//! Logging setup for the command-line binary.
//!
//! Library code only emits `tracing` events; this module installs the
//! subscriber. All log output goes to stderr so stdout carries nothing but
//! the report. `RUST_LOG` wins over the level passed in.
use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::population::errors::{PopError, PopResult};

/// Install a human-readable stderr subscriber filtered at `level` for this
/// crate and `warn` for dependencies.
///
/// Errors
/// ------
/// - [`PopError::Config`] when a global subscriber is already installed.
pub fn init_logging(level: &str) -> PopResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,gompertz_bayes={level}")));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| PopError::Config { reason: format!("logging already initialized: {e}") })
}
