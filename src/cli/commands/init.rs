//! `sm init` - create the issue database.

use crate::config::{CliOverrides, Config};
use crate::error::{MergeError, Result};
use crate::storage::IssueStore;
use std::fs;

pub fn execute(force: bool, json: bool, overrides: &CliOverrides) -> Result<()> {
    let config = Config::load(overrides)?;

    if config.db.exists() {
        if !force {
            return Err(MergeError::Config(format!(
                "database already exists at '{}' (use --force to recreate)",
                config.db.display()
            )));
        }
        fs::remove_file(&config.db)?;
    }

    if let Some(parent) = config.db.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    drop(IssueStore::open(&config.db)?);

    if json {
        println!(
            "{}",
            serde_json::json!({ "initialized": config.db.display().to_string() })
        );
    } else {
        println!("Initialized issue database at {}", config.db.display());
    }
    Ok(())
}
