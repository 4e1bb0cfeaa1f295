//! `sm history` - print an issue's change log.

use crate::cli::commands::open_store;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::model::ChangeKind;

pub fn execute(key: &str, json: bool, overrides: &CliOverrides) -> Result<()> {
    let (store, _) = open_store(overrides)?;
    let entries = store.select_changes(key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let author = entry.author.as_deref().unwrap_or("scan");
        match &entry.kind {
            ChangeKind::FieldChange {
                field,
                old_value,
                new_value,
            } => {
                println!(
                    "{} {} {}: {} -> {}",
                    entry.created_at.to_rfc3339(),
                    author,
                    field,
                    old_value.as_deref().unwrap_or("none"),
                    new_value.as_deref().unwrap_or("none"),
                );
            }
            ChangeKind::Comment { body } => {
                println!(
                    "{} {} commented: {body}",
                    entry.created_at.to_rfc3339(),
                    author
                );
            }
        }
    }
    Ok(())
}
