//! Issue key derivation.

use crate::model::RuleKey;
use sha2::{Digest, Sha256};

/// Derive the stable key for an issue from its identity parts: project,
/// rule, component, and a location fingerprint supplied by the analysis
/// engine.
///
/// Parts are separated by a null byte so that concatenation ambiguity
/// cannot produce colliding keys.
#[must_use]
pub fn issue_key(project: &str, rule: &RuleKey, component: &str, fingerprint: &str) -> String {
    let mut hasher = Sha256::new();

    let mut update = |s: &str| {
        hasher.update(s.as_bytes());
        hasher.update([0]);
    };

    update(project);
    update(&rule.repository);
    update(&rule.rule);
    update(component);
    hasher.update(fingerprint.as_bytes());

    format!("{:x}", hasher.finalize())
}
