use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{ExpertiseLevel, FeedbackRecord};

/// GitHub activity summary used by the exceptional-talent scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubStats {
    pub total_stars: u64,
    pub total_repos: u64,
    pub languages: BTreeSet<String>,
}

/// X (Twitter) analytics summary used by the exceptional-talent scorer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XAnalytics {
    pub followers_count: u64,
    pub avg_engagement_rate: f32,
    pub content_quality_score: f32,
}

/// A research paper credit. Only the count and venue participate in scoring;
/// the title is carried for display/evidence purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub venue: Option<String>,
}

/// Four independently-scored phone-screen sub-signals, each in [0,1].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhoneScreenResults {
    pub technical_depth: f32,
    pub problem_solving: f32,
    pub communication: f32,
    pub implementation: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchProfile {
    pub papers: Vec<Paper>,
    pub arxiv_author_id: Option<String>,
    pub orcid_id: Option<String>,
    pub research_contributions: Option<String>,
    pub research_areas: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub tenant_id: String,
    pub skills: BTreeSet<String>,
    pub domains: BTreeSet<String>,
    pub experience_years: u32,
    pub expertise_level: ExpertiseLevel,
    pub research: ResearchProfile,
    pub github_stats: GithubStats,
    pub x_analytics: XAnalytics,
    pub phone_screen_results: Option<PhoneScreenResults>,
    /// Set only by the clusterer; `None` until a successful cluster run
    /// assigns this candidate a label.
    pub ability_cluster: Option<String>,
    pub feedback_history: Vec<FeedbackRecord>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            skills: BTreeSet::new(),
            domains: BTreeSet::new(),
            experience_years: 0,
            expertise_level: ExpertiseLevel::default(),
            research: ResearchProfile::default(),
            github_stats: GithubStats::default(),
            x_analytics: XAnalytics::default(),
            phone_screen_results: None,
            ability_cluster: None,
            feedback_history: Vec::new(),
        }
    }

    /// Deterministic text rendering fed to the embedding adapter: sorted
    /// sets, stable field order, so identical normalized fields always
    /// render identically.
    pub fn embedding_text(&self) -> String {
        format!(
            "skills:{} domains:{} experience:{} level:{:?} research_areas:{}",
            self.skills.iter().cloned().collect::<Vec<_>>().join(","),
            self.domains.iter().cloned().collect::<Vec<_>>().join(","),
            self.experience_years,
            self.expertise_level,
            self.research
                .research_areas
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}
