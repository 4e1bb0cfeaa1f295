//! Candidate issue snapshots.
//!
//! A snapshot is the finite sequence of candidate issues the analysis
//! engine produced for one project. The engine consumes it exactly once,
//! strictly in order. The JSONL reader reports parse failures with line
//! numbers; dropping it releases the file handle.

use crate::error::{MergeError, Result};
use crate::model::{CommentDraft, Issue, Resolution, Severity, Status};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Mutable-field values as read by the scan, used to derive change
/// entries. Absent for new issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorState {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub message: String,
}

impl PriorState {
    /// The prior view of an issue's mutable fields, taken from a stored
    /// record.
    #[must_use]
    pub fn of(issue: &Issue) -> Self {
        Self {
            status: issue.status,
            resolution: issue.resolution,
            assignee: issue.assignee.clone(),
            severity: issue.severity,
            line: issue.line,
            message: issue.message.clone(),
        }
    }
}

/// One candidate issue from the snapshot stream.
///
/// For existing issues, `issue.selected_at` carries the value observed
/// when the scan read the stored record; it is the token the conditional
/// update checks against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIssue {
    pub issue: Issue,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<PriorState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<CommentDraft>,
}

impl CandidateIssue {
    /// Wrap a freshly discovered issue.
    #[must_use]
    pub fn new_issue(issue: Issue) -> Self {
        Self {
            issue,
            is_new: true,
            previous: None,
            comments: Vec::new(),
        }
    }

    /// Wrap the scan's proposal for an already-stored issue.
    #[must_use]
    pub fn existing(issue: Issue, previous: PriorState) -> Self {
        Self {
            issue,
            is_new: false,
            previous: Some(previous),
            comments: Vec::new(),
        }
    }

    /// Attach a run comment.
    #[must_use]
    pub fn with_comment(mut self, comment: CommentDraft) -> Self {
        self.comments.push(comment);
        self
    }

    /// Check internal consistency: a new issue has no prior state, an
    /// existing one must carry it.
    ///
    /// # Errors
    ///
    /// Returns a data-integrity error naming the issue.
    pub fn validate(&self) -> Result<()> {
        match (self.is_new, &self.previous) {
            (true, Some(_)) => Err(MergeError::InvalidCandidate {
                issue: self.issue.key.clone(),
                reason: "new issue carries prior state".to_string(),
            }),
            (false, None) => Err(MergeError::InvalidCandidate {
                issue: self.issue.key.clone(),
                reason: "existing issue missing prior state".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// Streaming JSONL snapshot reader: one `CandidateIssue` per line, empty
/// lines skipped.
#[derive(Debug)]
pub struct JsonlSnapshot {
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonlSnapshot {
    /// Open a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for JsonlSnapshot {
    type Item = Result<CandidateIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_no += 1;
            match self.lines.next()? {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Some(serde_json::from_str(&line).map_err(|e| {
                        MergeError::SnapshotParse {
                            line: self.line_no,
                            reason: e.to_string(),
                        }
                    }));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
