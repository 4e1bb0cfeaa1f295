//! Run-scoped transactional session and size-bounded batch commits.
//!
//! A reconciliation run owns exactly one [`RunSession`]. Deferred
//! operations (issue inserts, unconditional updates, change inserts) are
//! buffered as rows and executed at flush time; conditional updates
//! execute immediately inside the open transaction because their
//! affected-row count is the conflict signal. Either way every row since
//! the last commit belongs to the current batch and is committed, or
//! rolled back, together.

use crate::error::Result;
use crate::model::{ChangeEntry, Issue};
use crate::storage::sqlite::IssueStore;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

/// Default number of rows per commit cycle.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 250;

/// Session lifecycle: `Open -> Committed` on success, `Open -> Aborted`
/// on flush failure, cancellation, or drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Open,
    Committed,
    Aborted,
}

/// The run-scoped transaction handle.
///
/// Passed explicitly (inside the committer) rather than held as ambient
/// state; release is guaranteed on every exit path: `finish` commits,
/// `abort` rolls back, and dropping an open session rolls back.
#[derive(Debug)]
pub struct RunSession<'a> {
    store: &'a IssueStore,
    state: SessionState,
}

impl<'a> RunSession<'a> {
    /// Open the session and begin the first transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub fn begin(store: &'a IssueStore) -> Result<Self> {
        store.begin_immediate()?;
        Ok(Self {
            store,
            state: SessionState::Open,
        })
    }

    pub(crate) const fn store(&self) -> &'a IssueStore {
        self.store
    }

    /// Commit the current transaction and immediately begin the next one.
    fn commit_cycle(&mut self) -> Result<()> {
        self.store.commit()?;
        self.store.begin_immediate()?;
        Ok(())
    }

    /// Commit the final transaction and close the session.
    fn finish(&mut self) -> Result<()> {
        self.store.commit()?;
        self.state = SessionState::Committed;
        Ok(())
    }

    /// Roll back the current transaction and close the session.
    fn abort(&mut self) -> Result<()> {
        self.state = SessionState::Aborted;
        self.store.rollback()?;
        Ok(())
    }
}

impl Drop for RunSession<'_> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Aborted;
            if let Err(e) = self.store.rollback() {
                debug!("rollback on drop failed: {e}");
            }
        }
    }
}

/// One buffered write operation.
#[derive(Debug)]
enum PendingOp {
    InsertIssue { issue: Issue, rule_id: i64 },
    UpdateIssue(Issue),
    InsertChange(ChangeEntry),
}

/// Accumulates write operations and commits them in size-bounded batches.
#[derive(Debug)]
pub struct BatchCommitter<'a> {
    session: RunSession<'a>,
    pending: Vec<PendingOp>,
    rows_since_commit: usize,
    max_batch_size: usize,
    commit_cycles: usize,
}

impl<'a> BatchCommitter<'a> {
    /// Open a committer over a fresh run session.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub fn begin(store: &'a IssueStore, max_batch_size: usize) -> Result<Self> {
        let max_batch_size = max_batch_size.max(1);
        Ok(Self {
            session: RunSession::begin(store)?,
            pending: Vec::new(),
            rows_since_commit: 0,
            max_batch_size,
            commit_cycles: 0,
        })
    }

    /// The store behind this committer, for reads inside the open
    /// transaction (conflict re-reads).
    #[must_use]
    pub const fn store(&self) -> &'a IssueStore {
        self.session.store()
    }

    /// Commit cycles executed so far.
    #[must_use]
    pub const fn commit_cycles(&self) -> usize {
        self.commit_cycles
    }

    /// Buffer an issue insert.
    pub fn insert_issue(&mut self, issue: Issue, rule_id: i64) {
        self.pending.push(PendingOp::InsertIssue { issue, rule_id });
        self.rows_since_commit += 1;
    }

    /// Buffer an unconditional issue update.
    pub fn update_issue(&mut self, issue: Issue) {
        self.pending.push(PendingOp::UpdateIssue(issue));
        self.rows_since_commit += 1;
    }

    /// Buffer a change-log insert.
    pub fn insert_change(&mut self, entry: ChangeEntry) {
        self.pending.push(PendingOp::InsertChange(entry));
        self.rows_since_commit += 1;
    }

    /// Execute a conditional update immediately inside the open
    /// transaction. The write, if it matched, counts toward the current
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn update_issue_if_untouched(
        &mut self,
        issue: &Issue,
        observed_selected_at: DateTime<Utc>,
    ) -> Result<usize> {
        let count = self
            .session
            .store()
            .update_issue_if_untouched(issue, observed_selected_at)?;
        if count > 0 {
            self.rows_since_commit += 1;
        }
        Ok(count)
    }

    /// Flush boundary, called between issues so one issue's rows never
    /// split across commits.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails; the run must then abort.
    pub fn checkpoint(&mut self) -> Result<()> {
        if self.rows_since_commit >= self.max_batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Apply all buffered operations in buffering order, then commit and
    /// start the next transaction.
    fn flush(&mut self) -> Result<()> {
        trace!(rows = self.rows_since_commit, "flushing batch");
        self.apply_pending()?;
        self.session.commit_cycle()?;
        self.rows_since_commit = 0;
        self.commit_cycles += 1;
        Ok(())
    }

    fn apply_pending(&mut self) -> Result<()> {
        let store = self.session.store();
        for op in self.pending.drain(..) {
            match op {
                PendingOp::InsertIssue { issue, rule_id } => store.insert_issue(&issue, rule_id)?,
                PendingOp::UpdateIssue(issue) => store.update_issue(&issue)?,
                PendingOp::InsertChange(entry) => store.insert_change(&entry)?,
            }
        }
        Ok(())
    }

    /// Flush the remaining rows and commit the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush or commit fails; buffered work
    /// is rolled back in that case.
    pub fn finish(mut self) -> Result<usize> {
        self.apply_pending()?;
        self.session.finish()?;
        self.commit_cycles += 1;
        debug!(commits = self.commit_cycles, "batch session committed");
        Ok(self.commit_cycles)
    }

    /// Roll back everything since the last commit and close the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback itself fails.
    pub fn abort(mut self) -> Result<()> {
        self.pending.clear();
        self.session.abort()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RuleKey, Severity, Status};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn issue(key: &str) -> Issue {
        Issue {
            key: key.to_string(),
            project: "proj".to_string(),
            component: "src/lib.rs".to_string(),
            rule: RuleKey::new("squid", "S1481"),
            severity: Severity::Major,
            status: Status::Open,
            resolution: None,
            assignee: None,
            line: Some(1),
            message: "m".to_string(),
            created_at: ts(1_700_000_000),
            updated_at: ts(1_700_000_000),
            selected_at: None,
        }
    }

    #[test]
    fn buffered_rows_invisible_until_finish() {
        let store = IssueStore::open_memory().unwrap();
        let rule_id = store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();

        let mut committer = BatchCommitter::begin(&store, 100).unwrap();
        committer.insert_issue(issue("a"), rule_id);
        committer.insert_issue(issue("b"), rule_id);
        assert_eq!(store.count_issues().unwrap(), 0);

        committer.finish().unwrap();
        assert_eq!(store.count_issues().unwrap(), 2);
    }

    #[test]
    fn drop_without_finish_rolls_back() {
        let store = IssueStore::open_memory().unwrap();
        let rule_id = store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();

        {
            let mut committer = BatchCommitter::begin(&store, 1).unwrap();
            committer.insert_issue(issue("a"), rule_id);
            // No checkpoint, no finish: buffered row must vanish.
        }
        assert_eq!(store.count_issues().unwrap(), 0);
    }

    #[test]
    fn checkpoint_flushes_at_threshold() {
        let store = IssueStore::open_memory().unwrap();
        let rule_id = store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();

        let mut committer = BatchCommitter::begin(&store, 2).unwrap();
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            committer.insert_issue(issue(key), rule_id);
            committer.checkpoint().unwrap();
            let expected = (i + 1) / 2;
            assert_eq!(committer.commit_cycles(), expected);
        }
        let cycles = committer.finish().unwrap();
        assert_eq!(cycles, 3);
        assert_eq!(store.count_issues().unwrap(), 5);
    }

    #[test]
    fn flush_failure_leaves_no_partial_batch() {
        let store = IssueStore::open_memory().unwrap();
        let rule_id = store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();

        let mut committer = BatchCommitter::begin(&store, 100).unwrap();
        committer.insert_issue(issue("a"), rule_id);
        committer.insert_issue(issue("b"), rule_id);
        // Unknown rule id: the foreign key constraint fails at apply time.
        committer.insert_issue(issue("c"), 9999);

        assert!(committer.finish().is_err());
        assert_eq!(store.count_issues().unwrap(), 0);
    }

    #[test]
    fn abort_discards_buffered_rows() {
        let store = IssueStore::open_memory().unwrap();
        let rule_id = store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();

        let mut committer = BatchCommitter::begin(&store, 100).unwrap();
        committer.insert_issue(issue("a"), rule_id);
        committer.abort().unwrap();
        assert_eq!(store.count_issues().unwrap(), 0);
    }
}
