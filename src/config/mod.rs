//! Configuration management for `scanmerge`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables
//! 3. Defaults

use crate::error::{MergeError, Result};
use crate::storage::DEFAULT_MAX_BATCH_SIZE;
use std::env;
use std::path::PathBuf;

/// Default database filename in the working directory.
pub const DEFAULT_DB_FILENAME: &str = "scanmerge.db";

const ENV_DB: &str = "SCANMERGE_DB";
const ENV_BATCH_SIZE: &str = "SCANMERGE_BATCH_SIZE";
const ENV_LOCK_TIMEOUT: &str = "SCANMERGE_LOCK_TIMEOUT_MS";

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub lock_timeout_ms: Option<u64>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database path.
    pub db: PathBuf,
    /// Rows per commit cycle.
    pub max_batch_size: usize,
    /// `SQLite` busy timeout, if any.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db: PathBuf::from(DEFAULT_DB_FILENAME),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            lock_timeout_ms: None,
        }
    }
}

impl Config {
    /// Resolve configuration from overrides, environment, and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment value fails to parse.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(db) = env::var(ENV_DB) {
            if !db.trim().is_empty() {
                config.db = PathBuf::from(db);
            }
        }
        if let Ok(value) = env::var(ENV_BATCH_SIZE) {
            config.max_batch_size = parse_batch_size(&value)?;
        }
        if let Ok(value) = env::var(ENV_LOCK_TIMEOUT) {
            config.lock_timeout_ms = Some(value.parse().map_err(|_| {
                MergeError::Config(format!("invalid {ENV_LOCK_TIMEOUT}: {value}"))
            })?);
        }

        if let Some(ref db) = overrides.db {
            config.db.clone_from(db);
        }
        if let Some(batch_size) = overrides.batch_size {
            config.max_batch_size = validated_batch_size(batch_size)?;
        }
        if let Some(timeout) = overrides.lock_timeout_ms {
            config.lock_timeout_ms = Some(timeout);
        }

        Ok(config)
    }
}

fn parse_batch_size(value: &str) -> Result<usize> {
    let parsed: usize = value
        .parse()
        .map_err(|_| MergeError::Config(format!("invalid {ENV_BATCH_SIZE}: {value}")))?;
    validated_batch_size(parsed)
}

fn validated_batch_size(value: usize) -> Result<usize> {
    if value == 0 {
        return Err(MergeError::Config(
            "batch size must be at least 1".to_string(),
        ));
    }
    Ok(value)
}
