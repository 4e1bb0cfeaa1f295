//! Error types and handling for `scanmerge`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration for wrapped one-off errors
//! - Every fatal reconciliation error that can be pinned to a single
//!   issue carries that issue's key, so a failed run always reports the
//!   first offending record

use crate::model::RuleKey;
use thiserror::Error;

/// Primary error type for `scanmerge` operations.
#[derive(Error, Debug)]
pub enum MergeError {
    // === Data-integrity errors (fatal, never retried) ===
    /// The rule referenced by an incoming issue is not registered.
    #[error("Rule not found: {rule} (issue {issue})")]
    RuleNotFound { issue: String, rule: RuleKey },

    /// The stored row vanished between the conflict signal and the
    /// resolver's re-read.
    #[error("Conflict target missing: issue {issue} no longer stored")]
    ConflictTargetMissing { issue: String },

    /// A candidate record is internally inconsistent.
    #[error("Invalid candidate {issue}: {reason}")]
    InvalidCandidate { issue: String, reason: String },

    /// A change-log row could not be decoded.
    #[error("Corrupt change record: id {id}")]
    CorruptChangeRecord { id: i64 },

    // === Lookup errors ===
    /// A requested issue does not exist.
    #[error("Issue not found: {key}")]
    IssueNotFound { key: String },

    // === Conflict errors ===
    /// A second concurrent edit landed inside the resolver's own
    /// read-merge-write window.
    #[error("Concurrent edit during merge of issue {issue}")]
    MergeConflict { issue: String },

    // === Snapshot errors ===
    /// Failed to parse a line of the snapshot stream.
    #[error("Snapshot parse error at line {line}: {reason}")]
    SnapshotParse { line: usize, reason: String },

    /// A rule key string is not of the form `repository:rule`.
    #[error("Malformed rule key: {value}")]
    MalformedRuleKey { value: String },

    // === Validation errors ===
    /// Invalid severity value.
    #[error("Invalid severity: {value}")]
    InvalidSeverity { value: String },

    /// Invalid status value.
    #[error("Invalid status: {value}")]
    InvalidStatus { value: String },

    /// Invalid resolution value.
    #[error("Invalid resolution: {value}")]
    InvalidResolution { value: String },

    /// Unknown issue field name.
    #[error("Invalid issue field: {value}")]
    InvalidField { value: String },

    // === Run control ===
    /// The caller aborted the run; buffered work was rolled back.
    #[error("Run cancelled; uncommitted work rolled back")]
    Cancelled,

    // === Configuration errors ===
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O and storage errors ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    /// The key of the issue this error is pinned to, if any.
    #[must_use]
    pub fn issue_key(&self) -> Option<&str> {
        match self {
            Self::RuleNotFound { issue, .. }
            | Self::ConflictTargetMissing { issue }
            | Self::InvalidCandidate { issue, .. }
            | Self::MergeConflict { issue } => Some(issue),
            Self::IssueNotFound { key } => Some(key),
            _ => None,
        }
    }

    /// True when the error indicates bad input data rather than a
    /// transient storage condition.
    #[must_use]
    pub const fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::RuleNotFound { .. }
                | Self::ConflictTargetMissing { .. }
                | Self::InvalidCandidate { .. }
                | Self::CorruptChangeRecord { .. }
                | Self::SnapshotParse { .. }
                | Self::MalformedRuleKey { .. }
        )
    }

    /// Exit code for the CLI.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

/// Result type using `MergeError`.
pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MergeError::MergeConflict {
            issue: "ab12".to_string(),
        };
        assert_eq!(err.to_string(), "Concurrent edit during merge of issue ab12");
    }

    #[test]
    fn test_issue_key_extraction() {
        let err = MergeError::RuleNotFound {
            issue: "ab12".to_string(),
            rule: RuleKey::new("squid", "S1481"),
        };
        assert_eq!(err.issue_key(), Some("ab12"));

        let err = MergeError::Cancelled;
        assert_eq!(err.issue_key(), None);
    }

    #[test]
    fn test_data_integrity_classification() {
        assert!(
            MergeError::SnapshotParse {
                line: 3,
                reason: "bad json".to_string()
            }
            .is_data_integrity()
        );
        assert!(
            !MergeError::MergeConflict {
                issue: "x".to_string()
            }
            .is_data_integrity()
        );
    }
}
