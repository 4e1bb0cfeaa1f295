//! Batch commit discipline at run scale.

mod common;

use common::fixtures::issue;
use common::test_db;
use scanmerge::reconcile::{self, RunOptions};
use scanmerge::rules::RuleCache;
use scanmerge::snapshot::CandidateIssue;

fn options(max_batch_size: usize) -> RunOptions {
    RunOptions {
        max_batch_size,
        ..RunOptions::default()
    }
}

#[test]
fn large_run_commits_in_exact_cycles() {
    let store = test_db();
    common::fixtures::seed_rule(&store);
    let rules = RuleCache::load(&store).unwrap();

    // 10,050 new issues at 1,000 rows per cycle: ten full batches plus a
    // final one carrying the remaining 50 rows.
    let snapshot = (0..10_050).map(|i| Ok(CandidateIssue::new_issue(issue(&format!("k{i:05}")))));

    let report = reconcile::run(snapshot, &rules, &store, &options(1_000)).unwrap();

    assert_eq!(report.inserted, 10_050);
    assert_eq!(report.flushes, 11);
    assert_eq!(store.count_issues().unwrap(), 10_050);
}

#[test]
fn small_run_commits_once() {
    let store = test_db();
    common::fixtures::seed_rule(&store);
    let rules = RuleCache::load(&store).unwrap();

    let snapshot = (0..3).map(|i| Ok(CandidateIssue::new_issue(issue(&format!("k{i}")))));
    let report = reconcile::run(snapshot, &rules, &store, &options(1_000)).unwrap();

    assert_eq!(report.flushes, 1);
}

#[test]
fn flush_failure_discards_the_whole_batch() {
    let store = test_db();
    common::fixtures::seed_rule(&store);
    let rules = RuleCache::load(&store).unwrap();

    // Two candidates with the same key: the second insert violates the
    // primary key when the batch is applied, which must abort the run
    // and leave no rows behind.
    let snapshot = vec![
        Ok(CandidateIssue::new_issue(issue("dup"))),
        Ok(CandidateIssue::new_issue(issue("dup"))),
    ];

    let err = reconcile::run(snapshot, &rules, &store, &options(1_000)).unwrap_err();
    assert!(matches!(err, scanmerge::MergeError::Database(_)));
    assert_eq!(store.count_issues().unwrap(), 0);
}

#[test]
fn committed_batches_survive_a_later_failure() {
    let store = test_db();
    common::fixtures::seed_rule(&store);
    let rules = RuleCache::load(&store).unwrap();

    // Batch size 2: the first two inserts commit, then the duplicate in
    // the second batch fails. Only the already-committed batch remains.
    let snapshot = vec![
        Ok(CandidateIssue::new_issue(issue("a1"))),
        Ok(CandidateIssue::new_issue(issue("a2"))),
        Ok(CandidateIssue::new_issue(issue("a3"))),
        Ok(CandidateIssue::new_issue(issue("a3"))),
    ];

    assert!(reconcile::run(snapshot, &rules, &store, &options(2)).is_err());
    assert_eq!(store.count_issues().unwrap(), 2);
    assert!(store.select_issue("a1").unwrap().is_some());
    assert!(store.select_issue("a3").unwrap().is_none());
}
