//! Command implementations.

pub mod history;
pub mod init;
pub mod reconcile;
pub mod rules;
pub mod show;

use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::storage::IssueStore;

/// Open the store with the resolved configuration.
pub(crate) fn open_store(overrides: &CliOverrides) -> Result<(IssueStore, Config)> {
    let config = Config::load(overrides)?;
    let store = IssueStore::open_with_timeout(&config.db, config.lock_timeout_ms)?;
    Ok((store, config))
}
