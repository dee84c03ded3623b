//! Feedback ingestion and the bandit update it drives,
//! grounded on `original_source/backend/algorithms/feedback_loop.py`.
//!
//! Recruiter feedback text is parsed into a reward in `[0, 1]` by an
//! [`LlmAdapter`]; any parse or transport failure falls back to a neutral
//! reward rather than failing the caller, and the feedback is appended to
//! the candidate's history either way — feedback is never dropped, even
//! when it can't be resolved to a bandit update.

use std::sync::Arc;

#[cfg(feature = "external-embed")]
use serde::Deserialize;
use serde::Serialize;

use crate::bandit::registry::{BanditRegistry, PositionBandit};
use crate::bandit::{clipped_similarity, Bandit};
use crate::embed::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::graph::KnowledgeGraph;
use crate::model::{Candidate, EntityClass, FeedbackRecord, FeedbackType};

#[derive(Debug, Clone)]
pub struct ParsedFeedback {
    pub sentiment: String,
    pub reward: f32,
    pub confidence: f32,
}

pub trait LlmAdapter: Send + Sync {
    fn parse_feedback(&self, text: &str) -> CoreResult<ParsedFeedback>;
}

#[cfg(feature = "external-embed")]
#[derive(Deserialize)]
struct LlmFeedbackResponse {
    sentiment: String,
    reward: f32,
    confidence: f32,
}

/// Strips a leading/trailing ` ```json ` / ` ``` ` code fence, a common LLM
/// habit the reference implementation also guards against.
#[cfg(feature = "external-embed")]
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```")).unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(feature = "external-embed")]
fn parse_strict_json(text: &str) -> CoreResult<ParsedFeedback> {
    let cleaned = strip_code_fence(text);
    let parsed: LlmFeedbackResponse =
        serde_json::from_str(cleaned).map_err(|e| CoreError::TransportError(format!("malformed LLM feedback response: {e}")))?;
    if !(0.0..=1.0).contains(&parsed.reward) {
        return Err(CoreError::TransportError(format!("LLM feedback reward out of range: {}", parsed.reward)));
    }
    Ok(ParsedFeedback { sentiment: parsed.sentiment, reward: parsed.reward, confidence: parsed.confidence })
}

/// Deterministic, network-free keyword adapter. Always compiled in so tests
/// and the default configuration never depend on an external LLM service.
pub struct LocalLlmAdapter;

impl LlmAdapter for LocalLlmAdapter {
    fn parse_feedback(&self, text: &str) -> CoreResult<ParsedFeedback> {
        let lower = text.to_lowercase();
        const POSITIVE: &[&str] = &["excellent", "great", "impressive", "strong", "hire", "outstanding"];
        const NEGATIVE: &[&str] = &["not qualified", "poor", "weak", "reject", "unqualified", "fail"];

        let positive_hits = POSITIVE.iter().filter(|kw| lower.contains(*kw)).count();
        let negative_hits = NEGATIVE.iter().filter(|kw| lower.contains(*kw)).count();

        let (sentiment, reward) = if positive_hits > negative_hits {
            ("positive", (0.7 + 0.1 * positive_hits.min(3) as f32).min(1.0))
        } else if negative_hits > positive_hits {
            ("negative", (0.3 - 0.1 * negative_hits.min(3) as f32).max(0.0))
        } else {
            ("neutral", 0.5)
        };

        Ok(ParsedFeedback { sentiment: sentiment.to_string(), reward, confidence: 0.6 })
    }
}

/// `reqwest`-backed adapter for a real LLM feedback-parsing service. Falls
/// through to a transport error (never panics) on any network or parse
/// failure so `process_feedback`'s neutral fallback always applies.
#[cfg(feature = "external-embed")]
pub struct ExternalLlmAdapter {
    client: reqwest::blocking::Client,
    url: String,
}

#[cfg(feature = "external-embed")]
impl ExternalLlmAdapter {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> CoreResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::TransportError(format!("building LLM feedback client: {e}")))?;
        Ok(Self { client, url: url.into() })
    }
}

#[cfg(feature = "external-embed")]
impl LlmAdapter for ExternalLlmAdapter {
    fn parse_feedback(&self, text: &str) -> CoreResult<ParsedFeedback> {
        let body = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "feedback_text": text }))
            .send()
            .map_err(|e| CoreError::TransportError(format!("LLM feedback request failed: {e}")))?
            .text()
            .map_err(|e| CoreError::TransportError(format!("reading LLM feedback response: {e}")))?;
        parse_strict_json(&body)
    }
}

fn classify(reward: f32) -> FeedbackType {
    if reward >= 0.7 {
        FeedbackType::Positive
    } else if reward <= 0.3 {
        FeedbackType::Negative
    } else {
        FeedbackType::Neutral
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResult {
    pub reward: f32,
    pub feedback_type: FeedbackType,
    pub is_optimal: bool,
    pub selected_arm: Option<usize>,
    pub unresolved_reason: Option<String>,
    /// Learning-tracker snapshot taken after this interaction was recorded.
    /// `None` here; the facade in `engine` fills it in once it has recorded
    /// the interaction against its tracker, which this module has no handle
    /// to.
    pub learning_metrics: Option<crate::learning::LearningSummary>,
}

#[allow(clippy::too_many_arguments)]
fn warm_started_bandit(
    kg: &KnowledgeGraph,
    tenant_id: &str,
    arm_ids: &[String],
    position_embedding_text: &str,
    embedder: &dyn Embedder,
    warm_scale: f32,
    bandit_seed: u64,
    fg_lambda: f32,
) -> PositionBandit {
    let position_vector = embedder
        .embed(EntityClass::Position, position_embedding_text)
        .unwrap_or_else(|_| vec![0.0; embedder.dimension()]);
    let candidates: Vec<Candidate> = arm_ids.iter().filter_map(|id| kg.get_candidate(id, tenant_id).ok()).collect();
    let similarities: Vec<f32> = arm_ids
        .iter()
        .map(|id| {
            candidates
                .iter()
                .find(|c| &c.id == id)
                .and_then(|c| embedder.embed(EntityClass::Candidate, &c.embedding_text()).ok())
                .map(|v| clipped_similarity(&v, &position_vector))
                .unwrap_or(0.0)
        })
        .collect();
    PositionBandit {
        bandit: std::sync::Mutex::new(Bandit::warm_start(&similarities, warm_scale, bandit_seed).with_fg_lambda(fg_lambda)),
        candidate_ids: arm_ids.to_vec(),
    }
}

/// Full feedback pipeline: parse feedback text into a
/// reward via `llm` with a neutral fallback on any failure, locate the
/// candidate inside the position's frozen arm order, warm-start the
/// position's bandit on first use, update it, and append the feedback
/// record to the candidate's history unconditionally.
pub fn process_feedback(
    kg: &KnowledgeGraph,
    registry: &BanditRegistry,
    tenant_id: &str,
    candidate_id: &str,
    position_id: &str,
    feedback_text: &str,
    llm: &dyn LlmAdapter,
    embedder: &dyn Embedder,
    warm_scale: f32,
    bandit_seed: u64,
    fg_lambda: f32,
) -> CoreResult<FeedbackResult> {
    let (reward, feedback_type) = match llm.parse_feedback(feedback_text) {
        Ok(parsed) => (parsed.reward.clamp(0.0, 1.0), classify(parsed.reward)),
        Err(error) => {
            tracing::warn!(%error, "feedback LLM parse failed, falling back to neutral reward");
            (0.5, FeedbackType::Neutral)
        }
    };

    update_bandit_from_feedback(
        kg,
        registry,
        tenant_id,
        candidate_id,
        position_id,
        feedback_text,
        reward,
        feedback_type,
        embedder,
        warm_scale,
        bandit_seed,
        fg_lambda,
    )
}

/// Bandit-update half of [`process_feedback`], usable directly when the
/// reward is already known (e.g. from a pre-parsed feedback source). Always
/// appends the feedback record, even when the candidate isn't found in the
/// position's arm list. `feedback_text` is persisted verbatim on the
/// appended record; pass `""` when no recruiter text exists for this update.
#[allow(clippy::too_many_arguments)]
pub fn update_bandit_from_feedback(
    kg: &KnowledgeGraph,
    registry: &BanditRegistry,
    tenant_id: &str,
    candidate_id: &str,
    position_id: &str,
    feedback_text: &str,
    reward: f32,
    feedback_type: FeedbackType,
    embedder: &dyn Embedder,
    warm_scale: f32,
    bandit_seed: u64,
    fg_lambda: f32,
) -> CoreResult<FeedbackResult> {
    let position = kg.get_position(position_id, tenant_id)?;
    let arm_ids = position.arm_candidate_ids().to_vec();

    let mut unresolved_reason = None;
    let mut selected_arm = None;
    let mut is_optimal = reward >= 0.7;

    if arm_ids.iter().any(|id| id == candidate_id) {
        let position_text = position.embedding_text();
        let bandit_arc = registry.get_or_create(position_id, || {
            warm_started_bandit(kg, tenant_id, &arm_ids, &position_text, embedder, warm_scale, bandit_seed, fg_lambda)
        });
        match bandit_arc.arm_index(candidate_id) {
            Some(idx) => {
                let mut bandit = bandit_arc.bandit.lock().unwrap();
                if let Err(error) = bandit.update(idx, reward) {
                    unresolved_reason = Some(format!("bandit update failed: {error}"));
                } else {
                    selected_arm = Some(idx);
                }
            }
            None => {
                unresolved_reason = Some(format!("candidate {candidate_id} missing from frozen arm order"));
                is_optimal = false;
            }
        }
    } else {
        unresolved_reason = Some(format!("candidate {candidate_id} not among position {position_id}'s selected candidates"));
        is_optimal = false;
    }

    let record = FeedbackRecord {
        position_id: position_id.to_string(),
        feedback_text: feedback_text.to_string(),
        reward,
        feedback_type,
        timestamp: chrono::Utc::now(),
        unresolved_reason: unresolved_reason.clone(),
    };
    kg.update_candidate(candidate_id, tenant_id, |c| c.feedback_history.push(record), embedder)?;

    Ok(FeedbackResult { reward, feedback_type, is_optimal, selected_arm, unresolved_reason, learning_metrics: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::LocalEmbedder;
    use crate::model::Position;
    use crate::relational::RelationalStore;

    fn setup() -> (KnowledgeGraph, BanditRegistry, LocalEmbedder) {
        let kg = KnowledgeGraph::new(RelationalStore::open(":memory:").unwrap());
        let embedder = LocalEmbedder::new(16);
        let mut position = Position::new("p1", "t1", "Backend Engineer");
        position.selected_candidates = vec!["c1".to_string(), "c2".to_string()];
        kg.add_position(position, &embedder).unwrap();
        kg.add_candidate(Candidate::new("c1", "t1"), &embedder).unwrap();
        kg.add_candidate(Candidate::new("c2", "t1"), &embedder).unwrap();
        (kg, BanditRegistry::new(), embedder)
    }

    #[test]
    fn local_llm_adapter_scores_positive_language_highly() {
        let parsed = LocalLlmAdapter.parse_feedback("Excellent candidate, very strong technical depth").unwrap();
        assert!(parsed.reward >= 0.7);
        assert_eq!(parsed.sentiment, "positive");
    }

    #[test]
    fn local_llm_adapter_scores_negative_language_low() {
        let parsed = LocalLlmAdapter.parse_feedback("Not qualified, weak on fundamentals").unwrap();
        assert!(parsed.reward <= 0.3);
    }

    #[test]
    fn malformed_llm_response_falls_back_to_neutral() {
        struct BrokenAdapter;
        impl LlmAdapter for BrokenAdapter {
            fn parse_feedback(&self, _text: &str) -> CoreResult<ParsedFeedback> {
                Err(CoreError::TransportError("connection refused".to_string()))
            }
        }
        let (kg, registry, embedder) = setup();
        let result = process_feedback(&kg, &registry, "t1", "c1", "p1", "garbage", &BrokenAdapter, &embedder, 8.0, 1, 0.0).unwrap();
        assert_eq!(result.reward, 0.5);
        assert_eq!(result.feedback_type, FeedbackType::Neutral);
    }

    #[test]
    fn feedback_is_appended_even_when_candidate_is_not_an_arm() {
        let (kg, registry, embedder) = setup();
        kg.add_candidate(Candidate::new("stray", "t1"), &embedder).unwrap();
        let result = process_feedback(&kg, &registry, "t1", "stray", "p1", "Excellent", &LocalLlmAdapter, &embedder, 8.0, 1, 0.0).unwrap();
        assert!(result.unresolved_reason.is_some());
        assert!(!result.is_optimal);
        let candidate = kg.get_candidate("stray", "t1").unwrap();
        assert_eq!(candidate.feedback_history.len(), 1);
    }

    #[test]
    fn feedback_updates_the_right_bandit_arm() {
        let (kg, registry, embedder) = setup();
        process_feedback(&kg, &registry, "t1", "c2", "p1", "Excellent, hire", &LocalLlmAdapter, &embedder, 8.0, 1, 0.0).unwrap();
        let bandit = registry.get("p1").unwrap();
        assert_eq!(bandit.arm_index("c2"), Some(1));
    }

    #[test]
    fn feedback_text_is_persisted_on_the_history_record() {
        let (kg, registry, embedder) = setup();
        process_feedback(&kg, &registry, "t1", "c1", "p1", "Excellent candidate, strongly recommend", &LocalLlmAdapter, &embedder, 8.0, 1, 0.0).unwrap();
        let candidate = kg.get_candidate("c1", "t1").unwrap();
        assert_eq!(candidate.feedback_history.len(), 1);
        assert_eq!(candidate.feedback_history[0].feedback_text, "Excellent candidate, strongly recommend");
    }
}
