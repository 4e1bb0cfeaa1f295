//! `sm reconcile` - merge a scan snapshot into the store.

use crate::cli::ReconcileArgs;
use crate::cli::commands::open_store;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::reconcile::{self, RunOptions};
use crate::rules::RuleCache;
use crate::snapshot::JsonlSnapshot;

pub fn execute(args: &ReconcileArgs, json: bool, overrides: &CliOverrides) -> Result<()> {
    let merged_overrides = CliOverrides {
        batch_size: args.batch_size.or(overrides.batch_size),
        ..overrides.clone()
    };
    let (store, config) = open_store(&merged_overrides)?;

    let rules = RuleCache::load(&store)?;
    let snapshot = JsonlSnapshot::open(&args.snapshot)?;
    let options = RunOptions {
        max_batch_size: config.max_batch_size,
        ..RunOptions::default()
    };

    let report = reconcile::run(snapshot, &rules, &store, &options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Reconciled: {} inserted, {} updated, {} conflicts resolved, {} changes, {} commits",
            report.inserted, report.updated, report.conflicts, report.changes, report.flushes
        );
    }
    Ok(())
}
