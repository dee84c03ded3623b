use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::ExpertiseLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub must_haves: BTreeSet<String>,
    pub required_skills: BTreeSet<String>,
    pub optional_skills: BTreeSet<String>,
    pub domains: BTreeSet<String>,
    pub experience_level: ExpertiseLevel,
    /// Ordered list of candidate ids; this order is the bandit arm order.
    /// Canonical field — see [`Position::arm_candidate_ids`] for the
    /// `candidate_ids` fallback this repository resolves in favor of this
    /// field when both are present.
    pub selected_candidates: Vec<String>,
    /// Caller-supplied synonym accepted only on the feedback path for
    /// compatibility with callers that haven't migrated to
    /// `selected_candidates`. Never written by this core.
    pub candidate_ids: Vec<String>,
}

impl Position {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            title: title.into(),
            must_haves: BTreeSet::new(),
            required_skills: BTreeSet::new(),
            optional_skills: BTreeSet::new(),
            domains: BTreeSet::new(),
            experience_level: ExpertiseLevel::default(),
            selected_candidates: Vec::new(),
            candidate_ids: Vec::new(),
        }
    }

    /// `selected_candidates` wins when both fields are present;
    /// `candidate_ids` is used only when `selected_candidates` is empty.
    pub fn arm_candidate_ids(&self) -> &[String] {
        if !self.selected_candidates.is_empty() {
            &self.selected_candidates
        } else {
            &self.candidate_ids
        }
    }

    pub fn embedding_text(&self) -> String {
        format!(
            "title:{} must_haves:{} required_skills:{} optional_skills:{} domains:{} level:{:?}",
            self.title,
            self.must_haves.iter().cloned().collect::<Vec<_>>().join(","),
            self.required_skills.iter().cloned().collect::<Vec<_>>().join(","),
            self.optional_skills.iter().cloned().collect::<Vec<_>>().join(","),
            self.domains.iter().cloned().collect::<Vec<_>>().join(","),
            self.experience_level,
        )
    }
}
