//! `SQLite` store implementation.
//!
//! One `IssueStore` wraps one connection. A reconciliation run owns its
//! store exclusively; the interactive editor opens its own connection to
//! the same database file and goes through [`IssueStore::apply_user_edit`].

use crate::error::{MergeError, Result};
use crate::model::{
    ChangeEntry, ChangeKind, Issue, IssueField, Resolution, Rule, RuleKey, Severity, Status,
};
use crate::storage::schema::apply_schema;
use crate::util::time::{format_ts, from_millis, parse_ts, to_millis};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const CHANGE_TYPE_DIFF: &str = "diff";
const CHANGE_TYPE_COMMENT: &str = "comment";

/// SQLite-backed issue store.
#[derive(Debug)]
pub struct IssueStore {
    conn: Connection,
}

/// A user edit applied through the interactive path.
///
/// Outer `None` means "leave unchanged"; for `resolution` and `assignee`
/// the inner `Option` distinguishes "set" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UserEdit {
    pub status: Option<Status>,
    pub resolution: Option<Option<Resolution>>,
    pub assignee: Option<Option<String>>,
    pub comment: Option<String>,
}

impl UserEdit {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.resolution.is_none()
            && self.assignee.is_none()
            && self.comment.is_none()
    }
}

/// Raw issue row as read from the database, before enum parsing.
struct IssueRow {
    key: String,
    project: String,
    component: String,
    repository: String,
    rule_key: String,
    severity: String,
    status: String,
    resolution: Option<String>,
    assignee: Option<String>,
    line: Option<u32>,
    message: String,
    created_at: String,
    updated_at: String,
    selected_at: Option<i64>,
}

impl IssueRow {
    fn into_issue(self) -> Result<Issue> {
        Ok(Issue {
            key: self.key,
            project: self.project,
            component: self.component,
            rule: RuleKey::new(self.repository, self.rule_key),
            severity: Severity::from_str(&self.severity)?,
            status: Status::from_str(&self.status)?,
            resolution: self
                .resolution
                .as_deref()
                .map(Resolution::from_str)
                .transpose()?,
            assignee: self.assignee,
            line: self.line,
            message: self.message,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            selected_at: self.selected_at.map(from_millis).transpose()?,
        })
    }
}

const SELECT_ISSUE_SQL: &str = "SELECT i.key, i.project, i.component, r.repository, r.rule_key,
            i.severity, i.status, i.resolution, i.assignee, i.line, i.message,
            i.created_at, i.updated_at, i.selected_at
     FROM issues i JOIN rules r ON r.id = i.rule_id
     WHERE i.key = ?";

impl IssueStore {
    /// Open a connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    // === Transaction primitives (used by the run session) ===

    pub(crate) fn begin_immediate(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub(crate) fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    // === Rules ===

    /// Register a rule, returning its internal id. Registering the same
    /// key twice returns the existing id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn register_rule(&self, key: &RuleKey) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO rules (repository, rule_key) VALUES (?, ?)",
            rusqlite::params![key.repository, key.rule],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM rules WHERE repository = ? AND rule_key = ?",
            rusqlite::params![key.repository, key.rule],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All registered rules, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn select_rules(&self) -> Result<Vec<Rule>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, repository, rule_key FROM rules ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Rule {
                id: row.get(0)?,
                key: RuleKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
            })
        })?;
        let mut rules = Vec::new();
        for rule in rows {
            rules.push(rule?);
        }
        Ok(rules)
    }

    // === Issues ===

    /// Insert a freshly discovered issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the key collides or the rule id is unknown.
    pub fn insert_issue(&self, issue: &Issue, rule_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO issues (
                key, project, component, rule_id, severity, status, resolution,
                assignee, line, message, created_at, updated_at, selected_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                issue.key,
                issue.project,
                issue.component,
                rule_id,
                issue.severity.as_str(),
                issue.status.as_str(),
                issue.resolution.map(Resolution::as_str),
                issue.assignee,
                issue.line,
                issue.message,
                format_ts(issue.created_at),
                format_ts(issue.updated_at),
                issue.selected_at.map(to_millis),
            ],
        )?;
        Ok(())
    }

    /// Unconditionally write the scan's view of a stored issue.
    ///
    /// `selected_at` is deliberately not part of the SET list: scans never
    /// touch the human-edit marker, which keeps it monotonic.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn update_issue(&self, issue: &Issue) -> Result<()> {
        self.conn.execute(
            "UPDATE issues SET severity = ?, status = ?, resolution = ?, assignee = ?,
                line = ?, message = ?, updated_at = ?
             WHERE key = ?",
            rusqlite::params![
                issue.severity.as_str(),
                issue.status.as_str(),
                issue.resolution.map(Resolution::as_str),
                issue.assignee,
                issue.line,
                issue.message,
                format_ts(issue.updated_at),
                issue.key,
            ],
        )?;
        Ok(())
    }

    /// Conditionally write the scan's view: succeeds only if the stored
    /// `selected_at` has not advanced past the value observed when the
    /// scan read the issue. Returns the affected-row count; zero signals
    /// a concurrent human edit.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn update_issue_if_untouched(
        &self,
        issue: &Issue,
        observed_selected_at: DateTime<Utc>,
    ) -> Result<usize> {
        let count = self.conn.execute(
            "UPDATE issues SET severity = ?, status = ?, resolution = ?, assignee = ?,
                line = ?, message = ?, updated_at = ?
             WHERE key = ? AND selected_at IS NOT NULL AND selected_at <= ?",
            rusqlite::params![
                issue.severity.as_str(),
                issue.status.as_str(),
                issue.resolution.map(Resolution::as_str),
                issue.assignee,
                issue.line,
                issue.message,
                format_ts(issue.updated_at),
                issue.key,
                to_millis(observed_selected_at),
            ],
        )?;
        Ok(count)
    }

    /// Read one issue by key.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or if a stored value cannot
    /// be decoded.
    pub fn select_issue(&self, key: &str) -> Result<Option<Issue>> {
        let row = self
            .conn
            .query_row(SELECT_ISSUE_SQL, [key], |row| {
                Ok(IssueRow {
                    key: row.get(0)?,
                    project: row.get(1)?,
                    component: row.get(2)?,
                    repository: row.get(3)?,
                    rule_key: row.get(4)?,
                    severity: row.get(5)?,
                    status: row.get(6)?,
                    resolution: row.get(7)?,
                    assignee: row.get(8)?,
                    line: row.get(9)?,
                    message: row.get(10)?,
                    created_at: row.get(11)?,
                    updated_at: row.get(12)?,
                    selected_at: row.get(13)?,
                })
            })
            .optional()?;
        row.map(IssueRow::into_issue).transpose()
    }

    /// Number of stored issues.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn count_issues(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // === Change log ===

    /// Append one change entry. Entries are immutable once written.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn insert_change(&self, entry: &ChangeEntry) -> Result<()> {
        match &entry.kind {
            ChangeKind::FieldChange {
                field,
                old_value,
                new_value,
            } => {
                self.conn.execute(
                    "INSERT INTO issue_changes
                        (issue_key, change_type, field, old_value, new_value, author, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        entry.issue_key,
                        CHANGE_TYPE_DIFF,
                        field.as_str(),
                        old_value,
                        new_value,
                        entry.author,
                        format_ts(entry.created_at),
                    ],
                )?;
            }
            ChangeKind::Comment { body } => {
                self.conn.execute(
                    "INSERT INTO issue_changes
                        (issue_key, change_type, body, author, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                    rusqlite::params![
                        entry.issue_key,
                        CHANGE_TYPE_COMMENT,
                        body,
                        entry.author,
                        format_ts(entry.created_at),
                    ],
                )?;
            }
        }
        Ok(())
    }

    /// All change entries for an issue, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure or if a stored row cannot be
    /// decoded.
    pub fn select_changes(&self, issue_key: &str) -> Result<Vec<ChangeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, issue_key, change_type, field, old_value, new_value, body,
                    author, created_at
             FROM issue_changes WHERE issue_key = ? ORDER BY id",
        )?;
        let rows = stmt.query_map([issue_key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, issue_key, change_type, field, old_value, new_value, body, author, created_at) =
                row?;
            let kind = match change_type.as_str() {
                CHANGE_TYPE_DIFF => {
                    let field = field
                        .ok_or(MergeError::CorruptChangeRecord { id })?
                        .parse::<IssueField>()
                        .map_err(|_| MergeError::CorruptChangeRecord { id })?;
                    ChangeKind::FieldChange {
                        field,
                        old_value,
                        new_value,
                    }
                }
                CHANGE_TYPE_COMMENT => ChangeKind::Comment {
                    body: body.ok_or(MergeError::CorruptChangeRecord { id })?,
                },
                _ => return Err(MergeError::CorruptChangeRecord { id }),
            };
            entries.push(ChangeEntry {
                issue_key,
                author,
                kind,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(entries)
    }

    /// Number of stored change entries.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn count_changes(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM issue_changes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // === Interactive edit path ===

    /// Apply a human edit to a stored issue.
    ///
    /// This is the write path used by interactive sessions; it is what a
    /// reconciliation run races against. It advances `selected_at` to
    /// `max(stored, at)` and logs its own change entries for the fields
    /// that actually changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the issue does not exist or on database
    /// failure.
    pub fn apply_user_edit(
        &self,
        key: &str,
        edit: &UserEdit,
        author: &str,
        at: DateTime<Utc>,
    ) -> Result<Issue> {
        let current = self
            .select_issue(key)?
            .ok_or_else(|| MergeError::IssueNotFound {
                key: key.to_string(),
            })?;
        if edit.is_empty() {
            return Ok(current);
        }

        let mut updated = current.clone();
        if let Some(status) = edit.status {
            updated.status = status;
        }
        if let Some(ref resolution) = edit.resolution {
            updated.resolution = *resolution;
        }
        if let Some(ref assignee) = edit.assignee {
            updated.assignee.clone_from(assignee);
        }
        updated.updated_at = at;
        updated.selected_at = Some(match current.selected_at {
            Some(existing) => existing.max(at),
            None => at,
        });

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE issues SET status = ?, resolution = ?, assignee = ?,
                updated_at = ?, selected_at = ?
             WHERE key = ?",
            rusqlite::params![
                updated.status.as_str(),
                updated.resolution.map(Resolution::as_str),
                updated.assignee,
                format_ts(updated.updated_at),
                updated.selected_at.map(to_millis),
                key,
            ],
        )?;

        let author = Some(author.to_string());
        if updated.status != current.status {
            Self::insert_change_tx(
                &tx,
                &ChangeEntry::field_change(
                    key,
                    IssueField::Status,
                    Some(current.status.as_str().to_string()),
                    Some(updated.status.as_str().to_string()),
                    author.clone(),
                    at,
                ),
            )?;
        }
        if updated.resolution != current.resolution {
            Self::insert_change_tx(
                &tx,
                &ChangeEntry::field_change(
                    key,
                    IssueField::Resolution,
                    current.resolution.map(|r| r.as_str().to_string()),
                    updated.resolution.map(|r| r.as_str().to_string()),
                    author.clone(),
                    at,
                ),
            )?;
        }
        if updated.assignee != current.assignee {
            Self::insert_change_tx(
                &tx,
                &ChangeEntry::field_change(
                    key,
                    IssueField::Assignee,
                    current.assignee.clone(),
                    updated.assignee.clone(),
                    author.clone(),
                    at,
                ),
            )?;
        }
        if let Some(ref body) = edit.comment {
            Self::insert_change_tx(&tx, &ChangeEntry::comment(key, body.clone(), author, at))?;
        }
        tx.commit()?;

        Ok(updated)
    }

    fn insert_change_tx(tx: &rusqlite::Transaction<'_>, entry: &ChangeEntry) -> Result<()> {
        match &entry.kind {
            ChangeKind::FieldChange {
                field,
                old_value,
                new_value,
            } => {
                tx.execute(
                    "INSERT INTO issue_changes
                        (issue_key, change_type, field, old_value, new_value, author, created_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    rusqlite::params![
                        entry.issue_key,
                        CHANGE_TYPE_DIFF,
                        field.as_str(),
                        old_value,
                        new_value,
                        entry.author,
                        format_ts(entry.created_at),
                    ],
                )?;
            }
            ChangeKind::Comment { body } => {
                tx.execute(
                    "INSERT INTO issue_changes
                        (issue_key, change_type, body, author, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                    rusqlite::params![
                        entry.issue_key,
                        CHANGE_TYPE_COMMENT,
                        body,
                        entry.author,
                        format_ts(entry.created_at),
                    ],
                )?;
            }
        }
        Ok(())
    }
}
