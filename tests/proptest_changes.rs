//! Property tests for change derivation.

mod common;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use scanmerge::model::{
    ChangeKind, CommentDraft, Issue, IssueField, Resolution, RuleKey, Severity, Status,
};
use scanmerge::reconcile::changes::build_changes;
use scanmerge::snapshot::PriorState;

fn status_strategy() -> impl Strategy<Value = Status> {
    prop_oneof![
        Just(Status::Open),
        Just(Status::Confirmed),
        Just(Status::Reopened),
        Just(Status::Resolved),
        Just(Status::Closed),
    ]
}

fn resolution_strategy() -> impl Strategy<Value = Option<Resolution>> {
    prop_oneof![
        Just(None),
        Just(Some(Resolution::Fixed)),
        Just(Some(Resolution::FalsePositive)),
        Just(Some(Resolution::Removed)),
    ]
}

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Minor),
        Just(Severity::Major),
        Just(Severity::Critical),
        Just(Severity::Blocker),
    ]
}

prop_compose! {
    fn issue_strategy()(
        status in status_strategy(),
        resolution in resolution_strategy(),
        assignee in proptest::option::of("[a-z]{1,8}"),
        severity in severity_strategy(),
        line in proptest::option::of(1u32..10_000),
        message in "[ -~]{0,40}",
    ) -> Issue {
        Issue {
            key: "prop".to_string(),
            project: "proj".to_string(),
            component: "src/lib.rs".to_string(),
            rule: RuleKey::new("squid", "S1481"),
            severity,
            status,
            resolution,
            assignee,
            line,
            message,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            selected_at: None,
        }
    }
}

fn field_index(field: IssueField) -> usize {
    IssueField::DIFF_ORDER
        .iter()
        .position(|&f| f == field)
        .expect("field in order table")
}

proptest! {
    #[test]
    fn never_emits_noop_transitions(prev in issue_strategy(), next in issue_strategy()) {
        let prior = PriorState::of(&prev);
        let at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        for entry in build_changes(Some(&prior), &next, &[], at) {
            if let ChangeKind::FieldChange { old_value, new_value, .. } = entry.kind {
                prop_assert_ne!(old_value, new_value);
            }
        }
    }

    #[test]
    fn identical_states_emit_nothing(state in issue_strategy()) {
        let prior = PriorState::of(&state);
        let at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        prop_assert!(build_changes(Some(&prior), &state, &[], at).is_empty());
    }

    #[test]
    fn derivation_is_idempotent(prev in issue_strategy(), next in issue_strategy()) {
        let prior = PriorState::of(&prev);
        let at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        let a = build_changes(Some(&prior), &next, &[], at);
        let b = build_changes(Some(&prior), &next, &[], at);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn diffs_precede_comments_and_keep_field_order(
        prev in issue_strategy(),
        next in issue_strategy(),
        bodies in proptest::collection::vec("[ -~]{1,20}", 0..4),
    ) {
        let prior = PriorState::of(&prev);
        let at = Utc.timestamp_opt(1_700_000_500, 0).unwrap();
        let comments: Vec<CommentDraft> = bodies
            .iter()
            .map(|body| CommentDraft { author: None, body: body.clone() })
            .collect();

        let entries = build_changes(Some(&prior), &next, &comments, at);

        let mut seen_comment = false;
        let mut last_index = None;
        let mut comment_bodies = Vec::new();
        for entry in entries {
            match entry.kind {
                ChangeKind::FieldChange { field, .. } => {
                    prop_assert!(!seen_comment, "field change after comment");
                    let index = field_index(field);
                    if let Some(last) = last_index {
                        prop_assert!(index > last, "field order violated");
                    }
                    last_index = Some(index);
                }
                ChangeKind::Comment { body } => {
                    seen_comment = true;
                    comment_bodies.push(body);
                }
            }
        }
        prop_assert_eq!(comment_bodies, bodies);
    }
}
