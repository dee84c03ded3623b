//! Facade-level partial-update DTOs. Every field is
//! optional; `apply` only overwrites fields the caller actually set, leaving
//! everything else on the existing record untouched — the same "apply a
//! patch function under the write lock" shape [`crate::graph::KnowledgeGraph`]
//! already exposes via its `update_X(patch: impl FnOnce(&mut T))` methods.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::interviewer::InterviewOutcome;
use crate::model::{Candidate, ExpertiseLevel, GithubStats, Interviewer, PhoneScreenResults, Position, ResearchProfile, Team, XAnalytics};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatePatch {
    pub skills: Option<BTreeSet<String>>,
    pub domains: Option<BTreeSet<String>>,
    pub experience_years: Option<u32>,
    pub expertise_level: Option<ExpertiseLevel>,
    pub research: Option<ResearchProfile>,
    pub github_stats: Option<GithubStats>,
    pub x_analytics: Option<XAnalytics>,
    pub phone_screen_results: Option<PhoneScreenResults>,
}

impl CandidatePatch {
    pub fn apply(&self, candidate: &mut Candidate) {
        if let Some(v) = &self.skills {
            candidate.skills = v.clone();
        }
        if let Some(v) = &self.domains {
            candidate.domains = v.clone();
        }
        if let Some(v) = self.experience_years {
            candidate.experience_years = v;
        }
        if let Some(v) = self.expertise_level {
            candidate.expertise_level = v;
        }
        if let Some(v) = &self.research {
            candidate.research = v.clone();
        }
        if let Some(v) = &self.github_stats {
            candidate.github_stats = v.clone();
        }
        if let Some(v) = &self.x_analytics {
            candidate.x_analytics = v.clone();
        }
        if let Some(v) = &self.phone_screen_results {
            candidate.phone_screen_results = Some(v.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub needs: Option<BTreeSet<String>>,
    pub expertise: Option<BTreeSet<String>>,
    pub open_positions: Option<BTreeSet<String>>,
}

impl TeamPatch {
    pub fn apply(&self, team: &mut Team) {
        if let Some(v) = &self.name {
            team.name = v.clone();
        }
        if let Some(v) = &self.domain {
            team.domain = v.clone();
        }
        if let Some(v) = &self.needs {
            team.needs = v.clone();
        }
        if let Some(v) = &self.expertise {
            team.expertise = v.clone();
        }
        if let Some(v) = &self.open_positions {
            team.open_positions = v.clone();
        }
    }
}

/// `member_ids` is intentionally absent: team membership is only ever
/// mutated through [`crate::engine::RecruitingEngine::link_interviewer_to_team`]
/// so the interviewer/team pointers can't drift apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterviewerPatch {
    pub expertise: Option<BTreeSet<String>>,
    pub success_rate: Option<f32>,
    pub add_interview_outcome: Option<InterviewOutcome>,
}

impl InterviewerPatch {
    pub fn apply(&self, interviewer: &mut Interviewer) {
        if let Some(v) = &self.expertise {
            interviewer.expertise = v.clone();
        }
        if let Some(v) = self.success_rate {
            interviewer.success_rate = v;
        }
        if let Some(v) = &self.add_interview_outcome {
            interviewer.interview_history.push(v.clone());
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionPatch {
    pub title: Option<String>,
    pub must_haves: Option<BTreeSet<String>>,
    pub required_skills: Option<BTreeSet<String>>,
    pub optional_skills: Option<BTreeSet<String>>,
    pub domains: Option<BTreeSet<String>>,
    pub experience_level: Option<ExpertiseLevel>,
    pub selected_candidates: Option<Vec<String>>,
}

impl PositionPatch {
    pub fn apply(&self, position: &mut Position) {
        if let Some(v) = &self.title {
            position.title = v.clone();
        }
        if let Some(v) = &self.must_haves {
            position.must_haves = v.clone();
        }
        if let Some(v) = &self.required_skills {
            position.required_skills = v.clone();
        }
        if let Some(v) = &self.optional_skills {
            position.optional_skills = v.clone();
        }
        if let Some(v) = &self.domains {
            position.domains = v.clone();
        }
        if let Some(v) = self.experience_level {
            position.experience_level = v;
        }
        if let Some(v) = &self.selected_candidates {
            position.selected_candidates = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_patch_only_touches_set_fields() {
        let mut candidate = Candidate::new("c1", "t1");
        candidate.experience_years = 3;
        let patch = CandidatePatch { experience_years: Some(9), ..Default::default() };
        patch.apply(&mut candidate);
        assert_eq!(candidate.experience_years, 9);
        assert!(candidate.skills.is_empty());
    }

    #[test]
    fn position_patch_updates_selected_candidates() {
        let mut position = Position::new("p1", "t1", "Backend Engineer");
        let patch = PositionPatch {
            selected_candidates: Some(vec!["c1".to_string(), "c2".to_string()]),
            ..Default::default()
        };
        patch.apply(&mut position);
        assert_eq!(position.arm_candidate_ids(), &["c1".to_string(), "c2".to_string()]);
    }
}
