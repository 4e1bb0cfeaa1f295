//! `sm rules` - manage the rule registry.

use crate::cli::RulesCommands;
use crate::cli::commands::open_store;
use crate::config::CliOverrides;
use crate::error::{MergeError, Result};
use crate::model::RuleKey;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub fn execute(command: &RulesCommands, json: bool, overrides: &CliOverrides) -> Result<()> {
    match command {
        RulesCommands::Import { path } => import(path, json, overrides),
        RulesCommands::List => list(json, overrides),
    }
}

fn import(path: &Path, json: bool, overrides: &CliOverrides) -> Result<()> {
    let (store, _) = open_store(overrides)?;

    let reader = BufReader::new(File::open(path)?);
    let mut imported = 0usize;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let key: RuleKey =
            serde_json::from_str(&line).map_err(|e| MergeError::SnapshotParse {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        store.register_rule(&key)?;
        imported += 1;
    }

    if json {
        println!("{}", serde_json::json!({ "imported": imported }));
    } else {
        println!("Imported {imported} rules");
    }
    Ok(())
}

fn list(json: bool, overrides: &CliOverrides) -> Result<()> {
    let (store, _) = open_store(overrides)?;
    let rules = store.select_rules()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
    } else {
        for rule in rules {
            println!("{}\t{}", rule.id, rule.key);
        }
    }
    Ok(())
}
