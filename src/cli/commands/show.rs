//! `sm show` - print stored issues.

use crate::cli::commands::open_store;
use crate::config::CliOverrides;
use crate::error::{MergeError, Result};
use crate::model::Issue;

pub fn execute(keys: &[String], json: bool, overrides: &CliOverrides) -> Result<()> {
    let (store, _) = open_store(overrides)?;

    let mut issues = Vec::with_capacity(keys.len());
    for key in keys {
        let issue = store
            .select_issue(key)?
            .ok_or_else(|| MergeError::IssueNotFound { key: key.clone() })?;
        issues.push(issue);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        for issue in &issues {
            print_issue(issue);
        }
    }
    Ok(())
}

fn print_issue(issue: &Issue) {
    println!("{} [{} {}]", issue.key, issue.severity, issue.status);
    println!("  rule: {}", issue.rule);
    match issue.line {
        Some(line) => println!("  at: {}:{line}", issue.component),
        None => println!("  at: {}", issue.component),
    }
    println!("  message: {}", issue.message);
    if let Some(resolution) = issue.resolution {
        println!("  resolution: {resolution}");
    }
    if let Some(ref assignee) = issue.assignee {
        println!("  assignee: {assignee}");
    }
}
