//! Logging setup built on `tracing`.
//!
//! The `SCANMERGE_LOG` environment variable takes precedence over the
//! CLI verbosity flags and accepts the usual `EnvFilter` directives.

use crate::error::{MergeError, Result};
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "SCANMERGE_LOG";

fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Initialize logging for the binary.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| MergeError::Config(format!("failed to initialize logging: {e}")))
}

/// Initialize logging for tests; safe to call repeatedly.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    drop(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_test_writer()
            .try_init(),
    );
}
