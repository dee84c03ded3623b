//! Entity classes shared across the core, one file per class, plus the
//! [`Entity`] sum type that replaces the duck-typed profile records of the
//! reference implementation.

pub mod candidate;
pub mod embedding_record;
pub mod entity;
pub mod feedback_record;
pub mod interviewer;
pub mod position;
pub mod team;

pub use candidate::{Candidate, GithubStats, Paper, PhoneScreenResults, ResearchProfile, XAnalytics};
pub use embedding_record::EmbeddingRecord;
pub use entity::{Entity, EntityClass};
pub use feedback_record::{FeedbackRecord, FeedbackType};
pub use interviewer::{InterviewOutcome, Interviewer};
pub use position::Position;
pub use team::Team;

/// Ordered expertise levels; ordering is significant (the decision engine
/// and position-fit scoring both compare levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertiseLevel {
    Junior,
    Mid,
    Senior,
    Staff,
    Principal,
}

impl Default for ExpertiseLevel {
    fn default() -> Self {
        ExpertiseLevel::Mid
    }
}
