//! Top-level facade wiring every component into one public request surface:
//! a single struct callers construct once and hold for the process lifetime.
//!
//! [`RecruitingEngine`] owns the knowledge graph, the embedder, the LLM
//! feedback adapter, the per-position bandit registry, the clusterer and
//! the aggregate learning tracker, and converts every [`CoreError`] crossing
//! its boundary into the `{success, data, error}` envelope callers see —
//! no public method panics or raises on bad input or missing state.

pub mod patch;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::bandit::clipped_similarity;
use crate::bandit::registry::BanditRegistry;
use crate::cluster::{self, ClusterSummary, Clusterer};
use crate::config::Config;
use crate::embed::{Embedder, LocalEmbedder};
use crate::error::{CoreError, CoreResult};
use crate::feedback::{self, FeedbackResult, LlmAdapter, LocalLlmAdapter};
use crate::graph::KnowledgeGraph;
use crate::learning::{self, LearningDemoResult, LearningTracker};
use crate::model::{Candidate, Entity, EntityClass, FeedbackType, Interviewer, Position, Team};
use crate::query::{self, CandidateFilters, ScoredCandidate};
use crate::relational::RelationalStore;
use crate::scoring::decision_engine::{self, DecisionResult, ExtractedInfo};
use crate::scoring::exceptional_talent::{self, ExceptionalScore};
use crate::scoring::team_matcher::{self, InterviewerMatch, TeamMatch};

pub use patch::{CandidatePatch, InterviewerPatch, PositionPatch, TeamPatch};

/// Machine-readable error surfaced in a failed [`Envelope`]: the error
/// kind plus a human-readable message. Never a raw
/// exception — every public method catches [`CoreError`] and returns this
/// instead.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub kind: &'static str,
    pub message: String,
}

/// Every public operation returns one of these: either `success: true` with
/// `data`, or `success: false` with `error`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl<T> Envelope<T> {
    fn from_result(result: CoreResult<T>) -> Self {
        match result {
            Ok(data) => Envelope { success: true, data: Some(data), error: None },
            Err(error) => {
                let error = error.externalize();
                Envelope {
                    success: false,
                    data: None,
                    error: Some(ErrorEnvelope { kind: error.kind(), message: error.to_string() }),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionalCandidateResult {
    pub candidate_id: String,
    pub score: ExceptionalScore,
}

/// Top-level struct callers construct once and hold for the life of the
/// process: no hidden global singletons, every dependency constructed at
/// startup and held as a plain value.
pub struct RecruitingEngine {
    config: Config,
    graph: Arc<KnowledgeGraph>,
    embedder: Box<dyn Embedder>,
    llm: Box<dyn LlmAdapter>,
    bandits: BanditRegistry,
    clusterer: Mutex<Clusterer>,
    tracker: Mutex<LearningTracker>,
}

impl RecruitingEngine {
    /// Builds the engine from `config`: opens the relational store,
    /// constructs the embedder and LLM adapter (the external HTTP-backed
    /// variants are used only when a URL is configured *and* the
    /// `external-embed` feature is compiled in; otherwise the deterministic
    /// local adapters are used so the engine is always usable offline).
    pub fn new(config: Config) -> CoreResult<Self> {
        let relational = RelationalStore::open(&config.relational_store_path)?;
        let graph = Arc::new(KnowledgeGraph::new(relational));

        let embedder: Box<dyn Embedder> = Self::build_embedder(&config);
        let llm: Box<dyn LlmAdapter> = Self::build_llm_adapter(&config);

        let clusterer = Clusterer::new(
            config.clusterer_k_min,
            config.clusterer_k_max,
            config.clusterer_n_init,
            config.clusterer_seed,
        );

        Ok(Self {
            config,
            graph,
            embedder,
            llm,
            bandits: BanditRegistry::new(),
            clusterer: Mutex::new(clusterer),
            tracker: Mutex::new(LearningTracker::new()),
        })
    }

    #[cfg(feature = "external-embed")]
    fn build_embedder(config: &Config) -> Box<dyn Embedder> {
        match &config.embedding_service_url {
            Some(url) => Box::new(crate::embed::ExternalEmbedder::new(
                url.clone(),
                config.vector_dim,
                Duration::from_millis(config.embedding_service_timeout_ms),
            )),
            None => Box::new(LocalEmbedder::new(config.vector_dim)),
        }
    }

    #[cfg(not(feature = "external-embed"))]
    fn build_embedder(config: &Config) -> Box<dyn Embedder> {
        Box::new(LocalEmbedder::new(config.vector_dim))
    }

    #[cfg(feature = "external-embed")]
    fn build_llm_adapter(config: &Config) -> Box<dyn LlmAdapter> {
        match &config.llm_feedback_url {
            Some(url) => match crate::feedback::ExternalLlmAdapter::new(
                url.clone(),
                Duration::from_millis(config.llm_feedback_timeout_ms),
            ) {
                Ok(adapter) => Box::new(adapter),
                Err(_) => Box::new(LocalLlmAdapter),
            },
            None => Box::new(LocalLlmAdapter),
        }
    }

    #[cfg(not(feature = "external-embed"))]
    fn build_llm_adapter(_config: &Config) -> Box<dyn LlmAdapter> {
        Box::new(LocalLlmAdapter)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn similarity_between(&self, class_a: EntityClass, id_a: &str, class_b: EntityClass, id_b: &str) -> CoreResult<f32> {
        let a = self.graph.vector_index().fetch_by_id(class_a, id_a)?;
        let b = self.graph.vector_index().fetch_by_id(class_b, id_b)?;
        Ok(clipped_similarity(&a.vector, &b.vector))
    }

    // ---------- Candidate CRUD ----------

    pub fn add_candidate(&self, tenant_id: &str, mut candidate: Candidate) -> Envelope<String> {
        candidate.tenant_id = tenant_id.to_string();
        Envelope::from_result(self.graph.add_candidate(candidate, self.embedder.as_ref()))
    }

    pub fn get_candidate(&self, tenant_id: &str, id: &str) -> Envelope<Candidate> {
        Envelope::from_result(self.graph.get_candidate(id, tenant_id))
    }

    pub fn update_candidate(&self, tenant_id: &str, id: &str, patch: CandidatePatch) -> Envelope<Candidate> {
        Envelope::from_result(self.graph.update_candidate(id, tenant_id, |c| patch.apply(c), self.embedder.as_ref()))
    }

    // ---------- Team CRUD ----------

    pub fn add_team(&self, tenant_id: &str, mut team: Team) -> Envelope<String> {
        team.tenant_id = tenant_id.to_string();
        Envelope::from_result(self.graph.add_team(team, self.embedder.as_ref()))
    }

    pub fn get_team(&self, tenant_id: &str, id: &str) -> Envelope<Team> {
        Envelope::from_result(self.graph.get_team(id, tenant_id))
    }

    pub fn update_team(&self, tenant_id: &str, id: &str, patch: TeamPatch) -> Envelope<Team> {
        Envelope::from_result(self.graph.update_team(id, tenant_id, |t| patch.apply(t), self.embedder.as_ref()))
    }

    // ---------- Interviewer CRUD ----------

    pub fn add_interviewer(&self, tenant_id: &str, mut interviewer: Interviewer) -> Envelope<String> {
        interviewer.tenant_id = tenant_id.to_string();
        Envelope::from_result(self.graph.add_interviewer(interviewer, self.embedder.as_ref()))
    }

    pub fn get_interviewer(&self, tenant_id: &str, id: &str) -> Envelope<Interviewer> {
        Envelope::from_result(self.graph.get_interviewer(id, tenant_id))
    }

    pub fn update_interviewer(&self, tenant_id: &str, id: &str, patch: InterviewerPatch) -> Envelope<Interviewer> {
        Envelope::from_result(self.graph.update_interviewer(id, tenant_id, |i| patch.apply(i), self.embedder.as_ref()))
    }

    pub fn link_interviewer_to_team(&self, tenant_id: &str, interviewer_id: &str, team_id: &str) -> Envelope<()> {
        Envelope::from_result(self.graph.link_interviewer_to_team(interviewer_id, team_id, tenant_id, self.embedder.as_ref()))
    }

    // ---------- Position CRUD ----------

    pub fn add_position(&self, tenant_id: &str, mut position: Position) -> Envelope<String> {
        position.tenant_id = tenant_id.to_string();
        Envelope::from_result(self.graph.add_position(position, self.embedder.as_ref()))
    }

    pub fn get_position(&self, tenant_id: &str, id: &str) -> Envelope<Position> {
        Envelope::from_result(self.graph.get_position(id, tenant_id))
    }

    pub fn update_position(&self, tenant_id: &str, id: &str, patch: PositionPatch) -> Envelope<Position> {
        Envelope::from_result(self.graph.update_position(id, tenant_id, |p| patch.apply(p), self.embedder.as_ref()))
    }

    // ---------- Query engine ----------

    /// Pure metadata query when `similarity_query` is `None`; hybrid
    /// filter+vector query, with the documented timeout fallback, when it
    /// is `Some`.
    pub fn query_candidates(
        &self,
        tenant_id: &str,
        filters: CandidateFilters,
        similarity_query: Option<&str>,
        top_k: usize,
    ) -> Envelope<Vec<ScoredCandidate>> {
        let result = match similarity_query {
            Some(text) if !text.is_empty() => query::hybrid_query_candidates(
                &self.graph,
                tenant_id,
                &filters,
                self.embedder.as_ref(),
                text,
                top_k,
                Duration::from_millis(self.config.hybrid_search_deadline_ms),
            ),
            _ => Ok(query::query_candidates(&self.graph, tenant_id, &filters, top_k)),
        };
        Envelope::from_result(result)
    }

    // ---------- Exceptional talent ----------

    pub fn find_exceptional_talent(
        &self,
        tenant_id: &str,
        position_id: Option<&str>,
        min_score: f32,
        top_k: usize,
    ) -> Envelope<Vec<ExceptionalCandidateResult>> {
        let result: CoreResult<Vec<ExceptionalCandidateResult>> = (|| {
            let position = match position_id {
                Some(pid) => Some(self.graph.get_position(pid, tenant_id)?),
                None => None,
            };
            let candidates = self.graph.get_all_candidates(tenant_id);
            let mut scored = Vec::with_capacity(candidates.len());
            for candidate in &candidates {
                let position_arg = match &position {
                    Some(p) => {
                        let sim = self
                            .similarity_between(EntityClass::Candidate, &candidate.id, EntityClass::Position, &p.id)
                            .unwrap_or(0.0);
                        Some((p, sim))
                    }
                    None => None,
                };
                let score = exceptional_talent::score(candidate, position_arg, &self.config.exceptional_thresholds);
                if score.combined_score >= min_score {
                    scored.push(ExceptionalCandidateResult { candidate_id: candidate.id.clone(), score });
                }
            }
            scored.sort_by(|a, b| {
                b.score.combined_score.partial_cmp(&a.score.combined_score).unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(top_k);
            Ok(scored)
        })();
        Envelope::from_result(result)
    }

    pub fn score_candidate(&self, tenant_id: &str, candidate_id: &str, position_id: Option<&str>) -> Envelope<ExceptionalScore> {
        let result: CoreResult<ExceptionalScore> = (|| {
            let candidate = self.graph.get_candidate(candidate_id, tenant_id)?;
            let position = match position_id {
                Some(pid) => Some(self.graph.get_position(pid, tenant_id)?),
                None => None,
            };
            let position_arg = match &position {
                Some(p) => {
                    let sim = self.similarity_between(EntityClass::Candidate, candidate_id, EntityClass::Position, &p.id)?;
                    Some((p, sim))
                }
                None => None,
            };
            Ok(exceptional_talent::score(&candidate, position_arg, &self.config.exceptional_thresholds))
        })();
        Envelope::from_result(result)
    }

    // ---------- Team / interviewer matching ----------

    pub fn match_to_team(&self, tenant_id: &str, candidate_id: &str) -> Envelope<TeamMatch> {
        let result: CoreResult<TeamMatch> = (|| {
            let candidate = self.graph.get_candidate(candidate_id, tenant_id)?;
            let teams = self.graph.get_all_teams(tenant_id)?;
            let teams_with_similarity: Vec<(Team, f32)> = teams
                .into_iter()
                .map(|team| {
                    let similarity = self
                        .similarity_between(EntityClass::Candidate, candidate_id, EntityClass::Team, &team.id)
                        .unwrap_or(0.0);
                    (team, similarity)
                })
                .collect();
            team_matcher::match_to_team(&candidate, &teams_with_similarity, self.config.bandit_rng_seed)
                .ok_or_else(|| CoreError::NotFound(format!("no teams available in tenant {tenant_id}")))
        })();
        Envelope::from_result(result)
    }

    pub fn match_to_person(&self, tenant_id: &str, candidate_id: &str, team_id: &str) -> Envelope<InterviewerMatch> {
        let result: CoreResult<InterviewerMatch> = (|| {
            let candidate = self.graph.get_candidate(candidate_id, tenant_id)?;
            let members = self.graph.get_team_members(team_id, tenant_id)?;
            let members_with_similarity: Vec<(Interviewer, f32)> = members
                .into_iter()
                .map(|interviewer| {
                    let similarity = self
                        .similarity_between(EntityClass::Candidate, candidate_id, EntityClass::Interviewer, &interviewer.id)
                        .unwrap_or(0.0);
                    (interviewer, similarity)
                })
                .collect();
            team_matcher::match_to_person(&candidate, team_id, &members_with_similarity, self.config.bandit_rng_seed)
                .ok_or_else(|| CoreError::NotFound(format!("team {team_id} has no members")))
        })();
        Envelope::from_result(result)
    }

    // ---------- Decision engine ----------

    pub fn make_phone_screen_decision(
        &self,
        tenant_id: &str,
        candidate_id: &str,
        position_id: &str,
        extracted_info: Option<ExtractedInfo>,
    ) -> Envelope<DecisionResult> {
        let result: CoreResult<DecisionResult> = (|| {
            let candidate = self.graph.get_candidate(candidate_id, tenant_id)?;
            let position = self.graph.get_position(position_id, tenant_id)?;
            let similarity = self.similarity_between(EntityClass::Candidate, candidate_id, EntityClass::Position, position_id)?;
            Ok(decision_engine::make_decision(
                &candidate,
                &position,
                similarity,
                &extracted_info.unwrap_or_default(),
                self.config.similarity_threshold,
                self.config.confidence_threshold,
                self.config.must_have_strictness,
                self.config.bandit_rng_seed,
            ))
        })();
        Envelope::from_result(result)
    }

    // ---------- Feedback loop ----------

    pub fn process_feedback(&self, tenant_id: &str, candidate_id: &str, position_id: &str, feedback_text: &str) -> Envelope<FeedbackResult> {
        let result = feedback::process_feedback(
            &self.graph,
            &self.bandits,
            tenant_id,
            candidate_id,
            position_id,
            feedback_text,
            self.llm.as_ref(),
            self.embedder.as_ref(),
            self.config.bandit_warm_scale,
            self.config.bandit_rng_seed,
            self.config.bandit_fg_lambda,
        );
        Envelope::from_result(self.attach_learning_metrics(result))
    }

    pub fn update_bandit_from_feedback(&self, tenant_id: &str, candidate_id: &str, position_id: &str, reward: f32) -> Envelope<FeedbackResult> {
        let reward = reward.clamp(0.0, 1.0);
        let feedback_type = if reward >= 0.7 {
            FeedbackType::Positive
        } else if reward <= 0.3 {
            FeedbackType::Negative
        } else {
            FeedbackType::Neutral
        };
        let result = feedback::update_bandit_from_feedback(
            &self.graph,
            &self.bandits,
            tenant_id,
            candidate_id,
            position_id,
            "",
            reward,
            feedback_type,
            self.embedder.as_ref(),
            self.config.bandit_warm_scale,
            self.config.bandit_rng_seed,
            self.config.bandit_fg_lambda,
        );
        Envelope::from_result(self.attach_learning_metrics(result))
    }

    /// Records the interaction against the tracker and stamps the resulting
    /// metrics snapshot onto the outcome before it crosses the facade
    /// boundary, per the `learning_metrics` field named in the public
    /// `process_feedback`/`update_bandit_from_feedback` result shape.
    fn attach_learning_metrics(&self, result: CoreResult<FeedbackResult>) -> CoreResult<FeedbackResult> {
        result.map(|mut outcome| {
            let summary = {
                let mut tracker = self.tracker.lock().unwrap();
                tracker.record_interaction(outcome.selected_arm.unwrap_or(0), outcome.reward, outcome.is_optimal);
                tracker.summary()
            };
            outcome.learning_metrics = Some(summary);
            outcome
        })
    }

    pub fn learning_summary(&self) -> crate::learning::LearningSummary {
        self.tracker.lock().unwrap().summary()
    }

    pub fn learning_history_json(&self) -> Result<String, serde_json::Error> {
        self.tracker.lock().unwrap().history_json()
    }

    pub fn learning_history_csv(&self) -> String {
        self.tracker.lock().unwrap().history_csv()
    }

    // ---------- Clusterer ----------

    pub fn cluster_candidates(&self, tenant_id: &str) -> Envelope<ClusterSummary> {
        let result: CoreResult<ClusterSummary> = (|| {
            let candidates = self.graph.get_all_candidates(tenant_id);
            let mut vectors = Vec::with_capacity(candidates.len());
            for candidate in &candidates {
                vectors.push(self.graph.vector_index().fetch_by_id(EntityClass::Candidate, &candidate.id)?.vector);
            }
            let summary = {
                let mut clusterer = self.clusterer.lock().unwrap();
                clusterer.cluster_candidates(&candidates, &vectors)?
            };
            for candidate in &candidates {
                if let Some(label) = summary.cluster_assignments.get(&candidate.id).cloned() {
                    self.graph.update_candidate(&candidate.id, tenant_id, |c| c.ability_cluster = Some(label), self.embedder.as_ref())?;
                }
            }
            Ok(summary)
        })();
        Envelope::from_result(result)
    }

    pub fn assign_cluster(&self, tenant_id: &str, candidate_id: &str) -> Envelope<String> {
        let result: CoreResult<String> = (|| {
            self.graph.get_candidate(candidate_id, tenant_id)?;
            let vector = self.graph.vector_index().fetch_by_id(EntityClass::Candidate, candidate_id)?.vector;
            self.clusterer.lock().unwrap().assign_one(&vector)
        })();
        Envelope::from_result(result)
    }

    pub fn update_interviewer_cluster_rates(&self, tenant_id: &str) -> Envelope<BTreeMap<String, BTreeMap<String, f32>>> {
        Envelope::from_result(cluster::update_interviewer_cluster_rates(&self.graph, tenant_id, self.embedder.as_ref()))
    }

    // ---------- Learning demo ----------

    pub fn run_learning_demo(
        &self,
        tenant_id: &str,
        candidate_ids: &[String],
        position_id: &str,
        num_events: usize,
        feedback_probability: f32,
    ) -> Envelope<LearningDemoResult> {
        let result: CoreResult<LearningDemoResult> = (|| {
            if candidate_ids.is_empty() {
                return Err(CoreError::ValidationError("run_learning_demo requires a non-empty candidate list".to_string()));
            }
            self.graph.get_position(position_id, tenant_id)?;
            let position_vector = self.graph.vector_index().fetch_by_id(EntityClass::Position, position_id)?.vector;
            let mut similarities = Vec::with_capacity(candidate_ids.len());
            for candidate_id in candidate_ids {
                self.graph.get_candidate(candidate_id, tenant_id)?;
                let vector = self.graph.vector_index().fetch_by_id(EntityClass::Candidate, candidate_id)?.vector;
                similarities.push(clipped_similarity(&vector, &position_vector));
            }
            Ok(learning::run_learning_demo(
                &similarities,
                num_events,
                feedback_probability,
                self.config.bandit_warm_scale,
                self.config.bandit_rng_seed,
            ))
        })();
        Envelope::from_result(result)
    }

    // ---------- Offline maintenance ----------

    /// Walks the relational store and re-upserts any vector missing
    /// relative to it. Never invoked on the request path.
    pub fn reconcile(&self, tenant_id: &str) -> Envelope<usize> {
        Envelope::from_result(self.graph.reconcile(tenant_id, self.embedder.as_ref()))
    }

    /// Returns every entity as the `Entity` sum type, for
    /// callers that want a uniform view across classes (e.g. a bulk export).
    pub fn get_all_entities(&self, tenant_id: &str) -> CoreResult<Vec<Entity>> {
        let mut entities: Vec<Entity> = self.graph.get_all_candidates(tenant_id).into_iter().map(Entity::Candidate).collect();
        entities.extend(self.graph.get_all_teams(tenant_id)?.into_iter().map(Entity::Team));
        entities.extend(self.graph.get_all_interviewers(tenant_id)?.into_iter().map(Entity::Interviewer));
        entities.extend(self.graph.get_all_positions(tenant_id)?.into_iter().map(Entity::Position));
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;

    fn engine() -> RecruitingEngine {
        RecruitingEngine::new(Config { relational_store_path: ":memory:".to_string(), ..Config::default() }).unwrap()
    }

    #[test]
    fn add_and_get_candidate_round_trips_through_the_facade() {
        let engine = engine();
        let mut candidate = Candidate::new("c1", "ignored");
        candidate.skills = ["rust".to_string()].into_iter().collect();
        let added = engine.add_candidate("t1", candidate);
        assert!(added.success);
        let fetched = engine.get_candidate("t1", "c1");
        assert!(fetched.success);
        assert_eq!(fetched.data.unwrap().tenant_id, "t1");
    }

    #[test]
    fn get_missing_candidate_returns_failed_envelope_not_a_panic() {
        let engine = engine();
        let result = engine.get_candidate("t1", "missing");
        assert!(!result.success);
        assert_eq!(result.error.unwrap().kind, "not_found");
    }

    #[test]
    fn process_feedback_updates_the_bandit_and_the_aggregate_tracker() {
        let engine = engine();
        engine.add_candidate("t1", Candidate::new("c1", "t1"));
        engine.add_candidate("t1", Candidate::new("c2", "t1"));
        let mut position = Position::new("p1", "t1", "Backend Engineer");
        position.selected_candidates = vec!["c1".to_string(), "c2".to_string()];
        engine.add_position("t1", position);

        let result = engine.process_feedback("t1", "c1", "p1", "Excellent candidate, strongly recommend, hire");
        assert!(result.success);
        assert_eq!(engine.learning_summary().total_interactions, 1);
    }

    #[test]
    fn find_exceptional_talent_filters_by_min_score() {
        let engine = engine();
        engine.add_candidate("t1", Candidate::new("plain", "t1"));
        let result = engine.find_exceptional_talent("t1", None, 0.5, 10);
        assert!(result.success);
        assert!(result.data.unwrap().is_empty());
    }
}
