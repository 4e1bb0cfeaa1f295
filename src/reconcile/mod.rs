//! Reconciliation of a scan snapshot into the issue store.
//!
//! One run consumes one snapshot, strictly in order, and turns every
//! candidate into exactly one persistence decision:
//!
//! - new issue: resolve the rule id and insert
//! - stored issue that the scan closed, or that no human ever touched:
//!   write the scan's view directly
//! - stored issue a human touched: conditional update on `selected_at`;
//!   zero matched rows hands the issue to the conflict resolver
//!
//! All writes go through one batch committer, so a run either commits in
//! whole batches or leaves nothing behind from the failed batch.

pub mod changes;
mod resolver;

use crate::error::{MergeError, Result};
use crate::model::ChangeEntry;
use crate::rules::RuleCache;
use crate::snapshot::CandidateIssue;
use crate::storage::{BatchCommitter, DEFAULT_MAX_BATCH_SIZE, IssueStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Cooperative cancellation flag, checked between issues.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Options for one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Rows per commit cycle.
    pub max_batch_size: usize,
    /// Cancellation flag shared with the caller.
    pub cancel: CancelFlag,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            cancel: CancelFlag::new(),
        }
    }
}

/// Operation counts for a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Issues inserted.
    pub inserted: usize,
    /// Issues updated without conflict.
    pub updated: usize,
    /// Conflicts resolved by merge.
    pub conflicts: usize,
    /// Change entries written.
    pub changes: usize,
    /// Commit cycles executed.
    pub flushes: usize,
}

/// Reconcile a snapshot into the store.
///
/// # Errors
///
/// Returns the first fatal error; everything buffered since the last
/// commit is rolled back before returning.
pub fn run<I>(
    snapshot: I,
    rules: &RuleCache,
    store: &IssueStore,
    options: &RunOptions,
) -> Result<RunReport>
where
    I: IntoIterator<Item = Result<CandidateIssue>>,
{
    let mut committer = BatchCommitter::begin(store, options.max_batch_size)?;
    let mut report = RunReport::default();

    for item in snapshot {
        if options.cancel.is_cancelled() {
            committer.abort()?;
            return Err(MergeError::Cancelled);
        }
        let candidate = item?;
        candidate.validate()?;
        process_one(&mut committer, rules, &candidate, &mut report)?;
        committer.checkpoint()?;
    }

    report.flushes = committer.finish()?;
    info!(
        inserted = report.inserted,
        updated = report.updated,
        conflicts = report.conflicts,
        changes = report.changes,
        flushes = report.flushes,
        "reconciliation run committed"
    );
    Ok(report)
}

fn process_one(
    committer: &mut BatchCommitter<'_>,
    rules: &RuleCache,
    candidate: &CandidateIssue,
    report: &mut RunReport,
) -> Result<()> {
    let now = Utc::now();
    let mut issue = candidate.issue.clone();
    issue.updated_at = now;

    let entries: Vec<ChangeEntry> = if candidate.is_new {
        let rule_id =
            rules
                .rule_id(&issue.rule)
                .ok_or_else(|| MergeError::RuleNotFound {
                    issue: issue.key.clone(),
                    rule: issue.rule.clone(),
                })?;
        let entries = changes::build_changes(None, &issue, &candidate.comments, now);
        committer.insert_issue(issue, rule_id);
        report.inserted += 1;
        entries
    } else {
        let Some(previous) = candidate.previous.as_ref() else {
            return Err(MergeError::InvalidCandidate {
                issue: issue.key.clone(),
                reason: "existing issue missing prior state".to_string(),
            });
        };
        match issue.selected_at {
            // A human touched this record: the write is optimistic.
            Some(observed) if !issue.status.is_closed() => {
                let count = committer.update_issue_if_untouched(&issue, observed)?;
                if count == 0 {
                    debug!(issue = %issue.key, "conditional update lost to a concurrent edit");
                    let outcome = resolver::resolve(committer, &issue, now)?;
                    report.conflicts += 1;
                    let mut entries = changes::scan_fact_changes(previous, &outcome.issue, now);
                    entries.extend(outcome.merge_note);
                    entries.extend(changes::comment_entries(
                        &outcome.issue.key,
                        &candidate.comments,
                        now,
                    ));
                    entries
                } else {
                    report.updated += 1;
                    changes::build_changes(Some(previous), &issue, &candidate.comments, now)
                }
            }
            // Closed by the scan, or never touched by a human: the
            // scan's view is authoritative.
            _ => {
                let entries =
                    changes::build_changes(Some(previous), &issue, &candidate.comments, now);
                committer.update_issue(issue);
                report.updated += 1;
                entries
            }
        }
    };

    for entry in entries {
        committer.insert_change(entry);
        report.changes += 1;
    }
    Ok(())
}
