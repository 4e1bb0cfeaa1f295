//! Rule id lookup, cached per run.
//!
//! The rule catalog itself is maintained elsewhere; the engine only needs
//! `(repository, rule)` to internal-id resolution. The cache is loaded
//! once per run, read-only afterwards, and safe to share across parallel
//! runs.

use crate::error::Result;
use crate::model::RuleKey;
use crate::storage::IssueStore;
use std::collections::HashMap;

/// Read-only rule-id cache.
#[derive(Debug, Clone, Default)]
pub struct RuleCache {
    ids: HashMap<RuleKey, i64>,
}

impl RuleCache {
    /// Load every registered rule into the cache.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub fn load(store: &IssueStore) -> Result<Self> {
        let mut ids = HashMap::new();
        for rule in store.select_rules()? {
            ids.insert(rule.key, rule.id);
        }
        Ok(Self { ids })
    }

    /// Resolve a rule key to its internal id, if registered.
    #[must_use]
    pub fn rule_id(&self, key: &RuleKey) -> Option<i64> {
        self.ids.get(key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_resolves_registered_rules() {
        let store = IssueStore::open_memory().unwrap();
        let key = RuleKey::new("squid", "S1481");
        let id = store.register_rule(&key).unwrap();

        let cache = RuleCache::load(&store).unwrap();
        assert_eq!(cache.rule_id(&key), Some(id));
        assert_eq!(cache.rule_id(&RuleKey::new("squid", "S9999")), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_is_a_point_in_time_view() {
        let store = IssueStore::open_memory().unwrap();
        let cache = RuleCache::load(&store).unwrap();
        assert!(cache.is_empty());

        store.register_rule(&RuleKey::new("squid", "S1481")).unwrap();
        // Loaded before the rule existed: still empty.
        assert!(cache.is_empty());
    }
}
