//! Conflict resolution for concurrently edited issues.
//!
//! Invoked when a conditional update matched zero rows: a human edit
//! landed between the scan's read and the run's write. The resolver
//! re-reads the stored row and merges: fields that represent human
//! judgment keep the stored values, fields that represent objective scan
//! facts keep the proposed values. The merged record is written with a
//! second conditional update keyed on the re-read `selected_at`; a second
//! conflict inside that window is fatal rather than retried, which bounds
//! the cost of resolution against a fast-clicking human.

use crate::error::{MergeError, Result};
use crate::model::{ChangeEntry, Issue, IssueField};
use crate::reconcile::changes::issue_value;
use crate::storage::BatchCommitter;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use tracing::debug;

/// The merged record plus an optional entry documenting the decision.
#[derive(Debug)]
pub(crate) struct MergeOutcome {
    pub issue: Issue,
    pub merge_note: Option<ChangeEntry>,
}

/// Merge the scan's proposal with the concurrently edited stored row and
/// write the result.
pub(crate) fn resolve(
    committer: &mut BatchCommitter<'_>,
    proposed: &Issue,
    at: DateTime<Utc>,
) -> Result<MergeOutcome> {
    debug!(issue = %proposed.key, "resolving concurrent edit");

    let current = committer
        .store()
        .select_issue(&proposed.key)?
        .ok_or_else(|| MergeError::ConflictTargetMissing {
            issue: proposed.key.clone(),
        })?;

    let merged = merge_fields(&current, proposed, at);
    write_merged(committer, &merged, current.selected_at)?;

    let merge_note = merge_note(&current, proposed, at);
    Ok(MergeOutcome {
        issue: merged,
        merge_note,
    })
}

/// Write the merged record, guarded by the re-read `selected_at`. Zero
/// matched rows means a second edit landed inside the resolver's window.
fn write_merged(
    committer: &mut BatchCommitter<'_>,
    merged: &Issue,
    reread_selected_at: Option<DateTime<Utc>>,
) -> Result<()> {
    match reread_selected_at {
        Some(reread) => {
            let count = committer.update_issue_if_untouched(merged, reread)?;
            if count == 0 {
                return Err(MergeError::MergeConflict {
                    issue: merged.key.clone(),
                });
            }
        }
        // selected_at cannot regress to null, but a null re-read has
        // nothing left to guard: write directly.
        None => {
            committer.update_issue(merged.clone());
        }
    }
    Ok(())
}

/// Human judgment from the stored row, scan facts from the proposal.
fn merge_fields(current: &Issue, proposed: &Issue, at: DateTime<Utc>) -> Issue {
    Issue {
        key: proposed.key.clone(),
        project: proposed.project.clone(),
        component: proposed.component.clone(),
        rule: proposed.rule.clone(),
        severity: proposed.severity,
        status: current.status,
        resolution: current.resolution,
        assignee: current.assignee.clone(),
        line: proposed.line,
        message: proposed.message.clone(),
        created_at: current.created_at,
        updated_at: at,
        selected_at: current.selected_at,
    }
}

/// One comment entry naming each human-owned field the merge preserved
/// against a differing scan value. `None` when the scan agreed with the
/// human on all of them.
fn merge_note(current: &Issue, proposed: &Issue, at: DateTime<Utc>) -> Option<ChangeEntry> {
    let mut kept = Vec::new();
    for field in IssueField::HUMAN_OWNED {
        let stored = issue_value(current, field);
        let scanned = issue_value(proposed, field);
        if stored != scanned {
            kept.push((field, stored, scanned));
        }
    }
    if kept.is_empty() {
        return None;
    }

    let mut body = String::from("concurrent edit merge:");
    for (field, stored, scanned) in kept {
        let _ = write!(
            body,
            " {} kept '{}' over scan '{}';",
            field,
            stored.as_deref().unwrap_or("none"),
            scanned.as_deref().unwrap_or("none"),
        );
    }
    body.pop();

    Some(ChangeEntry::comment(proposed.key.clone(), body, None, at))
}
