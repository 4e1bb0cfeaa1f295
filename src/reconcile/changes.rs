//! Change derivation.
//!
//! Pure functions from issue states to change entries. Field diffs are
//! emitted in the fixed [`IssueField::DIFF_ORDER`], then comments in
//! arrival order, so change history stays diffable and testable. A field
//! whose value did not change produces nothing.

use crate::model::{ChangeEntry, CommentDraft, Issue, IssueField};
use crate::snapshot::PriorState;
use chrono::{DateTime, Utc};

/// Render a field of the new issue state for the change log.
pub(crate) fn issue_value(issue: &Issue, field: IssueField) -> Option<String> {
    match field {
        IssueField::Status => Some(issue.status.as_str().to_string()),
        IssueField::Resolution => issue.resolution.map(|r| r.as_str().to_string()),
        IssueField::Assignee => issue.assignee.clone(),
        IssueField::Severity => Some(issue.severity.as_str().to_string()),
        IssueField::Line => issue.line.map(|l| l.to_string()),
        IssueField::Message => Some(issue.message.clone()),
    }
}

/// Render a field of the prior state for the change log.
pub(crate) fn prior_value(prior: &PriorState, field: IssueField) -> Option<String> {
    match field {
        IssueField::Status => Some(prior.status.as_str().to_string()),
        IssueField::Resolution => prior.resolution.map(|r| r.as_str().to_string()),
        IssueField::Assignee => prior.assignee.clone(),
        IssueField::Severity => Some(prior.severity.as_str().to_string()),
        IssueField::Line => prior.line.map(|l| l.to_string()),
        IssueField::Message => Some(prior.message.clone()),
    }
}

fn diff_fields<'a>(
    fields: impl IntoIterator<Item = &'a IssueField>,
    previous: &PriorState,
    issue: &Issue,
    at: DateTime<Utc>,
) -> Vec<ChangeEntry> {
    let mut entries = Vec::new();
    for &field in fields {
        let old_value = prior_value(previous, field);
        let new_value = issue_value(issue, field);
        if old_value != new_value {
            entries.push(ChangeEntry::field_change(
                issue.key.clone(),
                field,
                old_value,
                new_value,
                None,
                at,
            ));
        }
    }
    entries
}

/// Entries for comments attached during this run, in arrival order.
pub fn comment_entries(
    issue_key: &str,
    comments: &[CommentDraft],
    at: DateTime<Utc>,
) -> Vec<ChangeEntry> {
    comments
        .iter()
        .map(|c| ChangeEntry::comment(issue_key, c.body.clone(), c.author.clone(), at))
        .collect()
}

/// Derive all change entries for one issue: field diffs against the
/// prior state (none for a brand-new issue, where creation is implied by
/// the insert), then comments.
#[must_use]
pub fn build_changes(
    previous: Option<&PriorState>,
    issue: &Issue,
    comments: &[CommentDraft],
    at: DateTime<Utc>,
) -> Vec<ChangeEntry> {
    let mut entries = match previous {
        Some(previous) => diff_fields(&IssueField::DIFF_ORDER, previous, issue, at),
        None => Vec::new(),
    };
    entries.extend(comment_entries(&issue.key, comments, at));
    entries
}

/// Diffs restricted to scan-owned fields, used after a conflict merge:
/// the human-owned transitions in the merged record were written (and
/// logged) by the interactive editor, not by this run.
#[must_use]
pub fn scan_fact_changes(
    previous: &PriorState,
    merged: &Issue,
    at: DateTime<Utc>,
) -> Vec<ChangeEntry> {
    diff_fields(&IssueField::SCAN_OWNED, previous, merged, at)
}
