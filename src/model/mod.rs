//! Core data types for `scanmerge`.
//!
//! This module defines the fundamental types used throughout the engine:
//! - `Issue` - A persisted finding tied to a project component and rule
//! - `Status` / `Resolution` / `Severity` - Issue lifecycle states
//! - `RuleKey` - External identity of a rule (`repository:rule`)
//! - `ChangeEntry` - Append-only audit record (field transition or comment)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Issue lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Open,
    Confirmed,
    Reopened,
    Resolved,
    Closed,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Confirmed => "confirmed",
            Self::Reopened => "reopened",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Closed issues are written without an optimistic check: the scan's
    /// view is authoritative once an issue is no longer detected.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = crate::error::MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "confirmed" => Ok(Self::Confirmed),
            "reopened" => Ok(Self::Reopened),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::MergeError::InvalidStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// How a resolved or closed issue was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Fixed,
    FalsePositive,
    Removed,
}

impl Resolution {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::FalsePositive => "false_positive",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = crate::error::MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "false_positive" | "false-positive" => Ok(Self::FalsePositive),
            "removed" => Ok(Self::Removed),
            other => Err(crate::error::MergeError::InvalidResolution {
                value: other.to_string(),
            }),
        }
    }
}

/// Severity as computed by the rule, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Minor,
    #[default]
    Major,
    Critical,
    Blocker,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
            Self::Blocker => "blocker",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = crate::error::MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "minor" => Ok(Self::Minor),
            "major" => Ok(Self::Major),
            "critical" => Ok(Self::Critical),
            "blocker" => Ok(Self::Blocker),
            other => Err(crate::error::MergeError::InvalidSeverity {
                value: other.to_string(),
            }),
        }
    }
}

/// External identity of a rule: a repository plus a rule key within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleKey {
    pub repository: String,
    pub rule: String,
}

impl RuleKey {
    #[must_use]
    pub fn new(repository: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            rule: rule.into(),
        }
    }

    /// Parse a `repository:rule` string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string has no `:` separator or either side
    /// is empty.
    pub fn parse(value: &str) -> crate::error::Result<Self> {
        match value.split_once(':') {
            Some((repository, rule)) if !repository.is_empty() && !rule.is_empty() => {
                Ok(Self::new(repository, rule))
            }
            _ => Err(crate::error::MergeError::MalformedRuleKey {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

/// A registered rule row: internal numeric id plus external key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub id: i64,
    pub key: RuleKey,
}

/// The primary issue entity.
///
/// Identity is the stable `key`, derived from project, rule, and a
/// location fingerprint. `selected_at` marks when a human last touched
/// mutable fields; it is the optimistic-concurrency token and is only
/// ever advanced by the interactive edit path, never by a scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Stable unique key.
    pub key: String,

    /// Project the issue belongs to.
    pub project: String,

    /// Component (file) path within the project.
    pub component: String,

    /// Rule that detected the issue.
    pub rule: RuleKey,

    /// Severity as computed by the rule.
    #[serde(default)]
    pub severity: Severity,

    /// Workflow status.
    #[serde(default)]
    pub status: Status,

    /// Resolution, set when the issue is settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// Assigned user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Line number within the component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    /// Message describing the finding.
    #[serde(default)]
    pub message: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,

    /// When a human last touched mutable fields (millisecond precision).
    /// Null until the first interactive edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_at: Option<DateTime<Utc>>,
}

/// Mutable issue fields, in the fixed order change entries are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueField {
    Status,
    Resolution,
    Assignee,
    Severity,
    Line,
    Message,
}

impl IssueField {
    /// Emission order for field diffs; keeps change history diffable.
    pub const DIFF_ORDER: [Self; 6] = [
        Self::Status,
        Self::Resolution,
        Self::Assignee,
        Self::Severity,
        Self::Line,
        Self::Message,
    ];

    /// Fields owned by human judgment; the stored value wins a conflict.
    pub const HUMAN_OWNED: [Self; 3] = [Self::Status, Self::Resolution, Self::Assignee];

    /// Objective scan facts; the scan's value wins a conflict.
    pub const SCAN_OWNED: [Self; 3] = [Self::Severity, Self::Line, Self::Message];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Resolution => "resolution",
            Self::Assignee => "assignee",
            Self::Severity => "severity",
            Self::Line => "line",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssueField {
    type Err = crate::error::MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Self::Status),
            "resolution" => Ok(Self::Resolution),
            "assignee" => Ok(Self::Assignee),
            "severity" => Ok(Self::Severity),
            "line" => Ok(Self::Line),
            "message" => Ok(Self::Message),
            other => Err(crate::error::MergeError::InvalidField {
                value: other.to_string(),
            }),
        }
    }
}

/// Payload of a change entry: exactly one field transition, or one
/// free-text comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeKind {
    FieldChange {
        field: IssueField,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        old_value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_value: Option<String>,
    },
    Comment {
        body: String,
    },
}

/// An immutable audit record attached to an issue.
///
/// Created once, never mutated, never deleted by this engine. An absent
/// author means the engine itself wrote the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub issue_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(flatten)]
    pub kind: ChangeKind,
    pub created_at: DateTime<Utc>,
}

impl ChangeEntry {
    #[must_use]
    pub fn field_change(
        issue_key: impl Into<String>,
        field: IssueField,
        old_value: Option<String>,
        new_value: Option<String>,
        author: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            issue_key: issue_key.into(),
            author,
            kind: ChangeKind::FieldChange {
                field,
                old_value,
                new_value,
            },
            created_at,
        }
    }

    #[must_use]
    pub fn comment(
        issue_key: impl Into<String>,
        body: impl Into<String>,
        author: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            issue_key: issue_key.into(),
            author,
            kind: ChangeKind::Comment { body: body.into() },
            created_at,
        }
    }
}

/// A free-text comment attached to a candidate issue during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_roundtrip() {
        for status in [
            Status::Open,
            Status::Confirmed,
            Status::Reopened,
            Status::Resolved,
            Status::Closed,
        ] {
            assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
        }
        assert!("bogus".parse::<Status>().is_err());
    }

    #[test]
    fn resolution_accepts_dash_variant() {
        assert_eq!(
            "false-positive".parse::<Resolution>().unwrap(),
            Resolution::FalsePositive
        );
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Blocker > Severity::Critical);
        assert!(Severity::Info < Severity::Minor);
    }

    #[test]
    fn rule_key_parse() {
        let key = RuleKey::parse("squid:S1481").unwrap();
        assert_eq!(key.repository, "squid");
        assert_eq!(key.rule, "S1481");
        assert_eq!(key.to_string(), "squid:S1481");

        assert!(RuleKey::parse("no-separator").is_err());
        assert!(RuleKey::parse(":empty-repo").is_err());
        assert!(RuleKey::parse("empty-rule:").is_err());
    }

    #[test]
    fn issue_serde_defaults_missing_fields() {
        let json = r#"{
            "key": "ab12",
            "project": "proj",
            "component": "src/lib.rs",
            "rule": {"repository": "squid", "rule": "S1481"},
            "message": "unused variable",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;
        let issue: Issue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.severity, Severity::Major);
        assert!(issue.resolution.is_none());
        assert!(issue.selected_at.is_none());
    }

    #[test]
    fn change_entry_serde_tagged() {
        let entry = ChangeEntry::field_change(
            "ab12",
            IssueField::Status,
            Some("open".to_string()),
            Some("closed".to_string()),
            None,
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"field_change\""));
        assert!(json.contains("\"field\":\"status\""));

        let back: ChangeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn diff_order_covers_all_human_owned() {
        for field in IssueField::HUMAN_OWNED {
            assert!(IssueField::DIFF_ORDER.contains(&field));
        }
    }
}
