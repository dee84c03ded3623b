use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewOutcome {
    pub candidate_id: String,
    /// Hire/no-hire result; `true` feeds the per-cluster success rate as a
    /// success when grouped by the candidate's cluster label at read time.
    pub result: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interviewer {
    pub id: String,
    pub tenant_id: String,
    pub expertise: BTreeSet<String>,
    pub success_rate: f32,
    pub cluster_success_rates: BTreeMap<String, f32>,
    pub interview_history: Vec<InterviewOutcome>,
    pub team_id: Option<String>,
}

impl Interviewer {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            expertise: BTreeSet::new(),
            success_rate: 0.5,
            cluster_success_rates: BTreeMap::new(),
            interview_history: Vec::new(),
            team_id: None,
        }
    }

    /// Default used whenever a candidate's cluster has no recorded history.
    pub const DEFAULT_CLUSTER_SUCCESS_RATE: f32 = 0.5;

    pub fn cluster_success_rate(&self, cluster: &str) -> f32 {
        self.cluster_success_rates
            .get(cluster)
            .copied()
            .unwrap_or(Self::DEFAULT_CLUSTER_SUCCESS_RATE)
    }

    pub fn embedding_text(&self) -> String {
        format!(
            "expertise:{} success_rate:{}",
            self.expertise.iter().cloned().collect::<Vec<_>>().join(","),
            self.success_rate,
        )
    }
}
