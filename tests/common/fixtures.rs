//! Shared builders for reconciliation tests.

use chrono::{DateTime, TimeZone, Utc};
use scanmerge::model::{CommentDraft, Issue, RuleKey, Severity, Status};
use scanmerge::snapshot::{CandidateIssue, PriorState};
use scanmerge::storage::IssueStore;

/// Second-aligned timestamp, safe for millisecond storage roundtrips.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn rule() -> RuleKey {
    RuleKey::new("squid", "S1481")
}

pub fn issue(key: &str) -> Issue {
    Issue {
        key: key.to_string(),
        project: "proj".to_string(),
        component: "src/lib.rs".to_string(),
        rule: rule(),
        severity: Severity::Major,
        status: Status::Open,
        resolution: None,
        assignee: None,
        line: Some(10),
        message: "unused variable".to_string(),
        created_at: ts(1_700_000_000),
        updated_at: ts(1_700_000_000),
        selected_at: None,
    }
}

/// Register the default rule and return its id.
pub fn seed_rule(store: &IssueStore) -> i64 {
    store.register_rule(&rule()).expect("register rule")
}

/// Insert a stored issue and return the stored view (as a scan would
/// read it).
pub fn seed_issue(store: &IssueStore, issue: &Issue) -> Issue {
    let rule_id = store.register_rule(&issue.rule).expect("register rule");
    store.insert_issue(issue, rule_id).expect("insert issue");
    store
        .select_issue(&issue.key)
        .expect("select issue")
        .expect("issue stored")
}

/// A candidate proposing `proposed` for the stored issue `read`, with the
/// prior state and observed `selected_at` taken from the stored view.
pub fn candidate_for(read: &Issue, mut proposed: Issue) -> CandidateIssue {
    proposed.selected_at = read.selected_at;
    CandidateIssue::existing(proposed, PriorState::of(read))
}

pub fn comment(body: &str) -> CommentDraft {
    CommentDraft {
        author: None,
        body: body.to_string(),
    }
}
