use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub position_id: String,
    pub feedback_text: String,
    pub reward: f32,
    pub feedback_type: FeedbackType,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Set when the bandit update could not be applied (missing position,
    /// candidate not in the arm list, etc); the feedback is still appended
    /// to history per the "never drop feedback" policy, with this marker
    /// explaining why no arm was updated.
    pub unresolved_reason: Option<String>,
}
