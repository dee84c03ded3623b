//! Per-position bandit registry.
//!
//! A typed map from position id to `{bandit, candidate_ids}`. The registry
//! lock only ever guards the insert-if-absent path; once an entry exists,
//! callers take the per-entry mutex directly, so concurrent feedback events
//! for *different* positions never contend with one another.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::bandit::Bandit;

/// One position's bandit plus the frozen arm order captured at creation
/// time. The arm order never changes for the life of the entry, even if the
/// position's candidate list is mutated afterward.
pub struct PositionBandit {
    pub bandit: Mutex<Bandit>,
    pub candidate_ids: Vec<String>,
}

impl PositionBandit {
    pub fn arm_index(&self, candidate_id: &str) -> Option<usize> {
        self.candidate_ids.iter().position(|id| id == candidate_id)
    }
}

/// Registry of per-position bandits, keyed by position id.
#[derive(Default)]
pub struct BanditRegistry {
    entries: Mutex<HashMap<String, std::sync::Arc<PositionBandit>>>,
}

impl BanditRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing entry for `position_id`, if any, without
    /// creating one.
    pub fn get(&self, position_id: &str) -> Option<std::sync::Arc<PositionBandit>> {
        self.entries.lock().unwrap().get(position_id).cloned()
    }

    /// Returns the existing entry, or creates one from `make` and inserts it.
    /// `make` runs only when no entry exists yet for `position_id`.
    pub fn get_or_create(
        &self,
        position_id: &str,
        make: impl FnOnce() -> PositionBandit,
    ) -> std::sync::Arc<PositionBandit> {
        let mut guard = self.entries.lock().unwrap();
        guard
            .entry(position_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(make()))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let registry = BanditRegistry::new();
        let a = registry.get_or_create("p1", || PositionBandit {
            bandit: Mutex::new(Bandit::cold_start(2, 1)),
            candidate_ids: vec!["c1".into(), "c2".into()],
        });
        let b = registry.get_or_create("p1", || {
            panic!("make should not run twice");
        });
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(a.arm_index("c2"), Some(1));
    }
}
