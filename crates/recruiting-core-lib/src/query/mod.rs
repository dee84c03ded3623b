//! Composable candidate filters plus the hybrid vector+filter query engine
//! grounded on
//! `original_source/backend/matching/query_engine.py`.
//!
//! Filtering is pure and synchronous; the vector half of a hybrid query is
//! dispatched to a worker thread with a hard deadline so a slow or
//! unreachable vector backend can never block a caller past the deadline —
//! the reference implementation enforces the same bound with
//! `threading.Thread.join(timeout=3.0)`. A thread that misses the deadline
//! is abandoned, not cancelled; its eventual result is discarded by simply
//! having no receiver left listening.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::embed::Embedder;
use crate::error::CoreResult;
use crate::graph::KnowledgeGraph;
use crate::model::{Candidate, EntityClass};

/// Boolean/range filters over candidate fields. Every field defaults to "no
/// constraint"; an empty filter set matches every candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateFilters {
    pub skills_required: Vec<String>,
    pub skills_optional: Vec<String>,
    pub skills_excluded: Vec<String>,
    pub domains_required: Vec<String>,
    pub domains_excluded: Vec<String>,
    pub min_arxiv_papers: Option<u32>,
    pub min_github_stars: Option<u64>,
    pub min_experience_years: Option<u32>,
    pub max_experience_years: Option<u32>,
    pub ability_cluster: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub similarity_score: Option<f32>,
}

impl ScoredCandidate {
    fn unscored(candidate: Candidate) -> Self {
        Self { candidate, similarity_score: None }
    }
}

fn contains_case_insensitive(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_skill(candidate_skills: &std::collections::BTreeSet<String>, filter_skill: &str) -> bool {
    candidate_skills.iter().any(|skill| contains_case_insensitive(skill, filter_skill))
}

fn matches_domain(candidate_domains: &std::collections::BTreeSet<String>, filter_domain: &str) -> bool {
    candidate_domains.iter().any(|domain| contains_case_insensitive(domain, filter_domain))
}

/// Applies every active filter in a fixed order: skills,
/// domains, arxiv papers, github stars, experience years, ability cluster.
/// The order is commutative for the final set (every filter is a pure AND)
/// but is kept fixed so profiling and logging stay comparable across runs.
pub fn apply_filters(candidates: &[Candidate], filters: &CandidateFilters) -> Vec<Candidate> {
    let mut pool: Vec<Candidate> = candidates.to_vec();

    if !filters.skills_required.is_empty() {
        pool.retain(|c| filters.skills_required.iter().all(|s| matches_skill(&c.skills, s)));
    }
    if !filters.skills_optional.is_empty() {
        pool.retain(|c| filters.skills_optional.iter().any(|s| matches_skill(&c.skills, s)));
    }
    if !filters.skills_excluded.is_empty() {
        pool.retain(|c| !filters.skills_excluded.iter().any(|s| matches_skill(&c.skills, s)));
    }

    if !filters.domains_required.is_empty() {
        pool.retain(|c| filters.domains_required.iter().all(|d| matches_domain(&c.domains, d)));
    }
    if !filters.domains_excluded.is_empty() {
        pool.retain(|c| !filters.domains_excluded.iter().any(|d| matches_domain(&c.domains, d)));
    }

    if let Some(min_papers) = filters.min_arxiv_papers {
        pool.retain(|c| c.research.papers.len() as u32 >= min_papers);
    }

    if let Some(min_stars) = filters.min_github_stars {
        pool.retain(|c| c.github_stats.total_stars >= min_stars);
    }

    let min_years = filters.min_experience_years.unwrap_or(0);
    let max_years = filters.max_experience_years.unwrap_or(999);
    pool.retain(|c| c.experience_years >= min_years && c.experience_years <= max_years);

    if let Some(cluster) = &filters.ability_cluster {
        pool.retain(|c| c.ability_cluster.as_deref() == Some(cluster.as_str()));
    }

    pool
}

/// Filter-only query: no embedding lookup, no deadline, every hit
/// unscored. Used when the caller supplies no similarity query text.
pub fn query_candidates(kg: &KnowledgeGraph, tenant_id: &str, filters: &CandidateFilters, top_k: usize) -> Vec<ScoredCandidate> {
    apply_filters(&kg.get_all_candidates(tenant_id), filters)
        .into_iter()
        .take(top_k)
        .map(ScoredCandidate::unscored)
        .collect()
}

/// Filter-then-vector-search hybrid query. The vector
/// search is sized `min(2 * top_k, 100)`, dispatched on its own thread, and
/// joined with `deadline`. On timeout, transport error, or an empty hit
/// set, falls back to the filtered (unscored) results truncated to
/// `top_k` rather than failing the caller.
pub fn hybrid_query_candidates(
    kg: &Arc<KnowledgeGraph>,
    tenant_id: &str,
    filters: &CandidateFilters,
    embedder: &dyn Embedder,
    similarity_query: &str,
    top_k: usize,
    deadline: Duration,
) -> CoreResult<Vec<ScoredCandidate>> {
    let filtered = apply_filters(&kg.get_all_candidates(tenant_id), filters);
    let query_vector = embedder.embed(EntityClass::Candidate, similarity_query)?;
    let search_k = (top_k * 2).min(100);

    let kg_for_thread = Arc::clone(kg);
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = kg_for_thread.vector_index().search(EntityClass::Candidate, &query_vector, search_k);
        let _ = tx.send(result);
    });

    let fallback = || filtered.iter().take(top_k).cloned().map(ScoredCandidate::unscored).collect();

    match rx.recv_timeout(deadline) {
        Ok(Ok(hits)) if !hits.is_empty() => {
            let similarity_by_id: HashMap<&str, f32> = hits.iter().map(|h| (h.profile_id.as_str(), h.similarity)).collect();
            let mut scored: Vec<ScoredCandidate> = filtered
                .iter()
                .filter_map(|c| similarity_by_id.get(c.id.as_str()).map(|score| ScoredCandidate { candidate: c.clone(), similarity_score: Some(*score) }))
                .collect();
            scored.sort_by(|a, b| b.similarity_score.partial_cmp(&a.similarity_score).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(top_k);
            Ok(scored)
        }
        Ok(Ok(_)) => {
            tracing::warn!("hybrid query returned no vector hits, falling back to filtered results");
            Ok(fallback())
        }
        Ok(Err(error)) => {
            tracing::warn!(%error, "hybrid query vector search failed, falling back to filtered results");
            Ok(fallback())
        }
        Err(_) => {
            tracing::warn!(deadline_ms = deadline.as_millis() as u64, "hybrid query exceeded deadline, falling back to filtered results");
            Ok(fallback())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::LocalEmbedder;
    use crate::relational::RelationalStore;
    use std::time::Duration;

    fn candidate(id: &str, skills: &[&str], domains: &[&str], years: u32) -> Candidate {
        let mut c = Candidate::new(id, "t1");
        c.skills = skills.iter().map(|s| s.to_string()).collect();
        c.domains = domains.iter().map(|s| s.to_string()).collect();
        c.experience_years = years;
        c
    }

    #[test]
    fn required_skills_filter_is_case_insensitive_substring() {
        let candidates = vec![
            candidate("c1", &["Rust", "Systems"], &[], 5),
            candidate("c2", &["Python"], &[], 5),
        ];
        let filters = CandidateFilters { skills_required: vec!["rust".to_string()], ..Default::default() };
        let result = apply_filters(&candidates, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "c1");
    }

    #[test]
    fn experience_range_defaults_max_to_999() {
        let candidates = vec![candidate("c1", &[], &[], 50)];
        let filters = CandidateFilters { min_experience_years: Some(10), ..Default::default() };
        assert_eq!(apply_filters(&candidates, &filters).len(), 1);
    }

    #[test]
    fn excluded_skills_remove_matches() {
        let candidates = vec![candidate("c1", &["CUDA"], &[], 5), candidate("c2", &["React"], &[], 5)];
        let filters = CandidateFilters { skills_excluded: vec!["cuda".to_string()], ..Default::default() };
        let result = apply_filters(&candidates, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "c2");
    }

    #[test]
    fn required_domain_filter_is_case_insensitive_substring() {
        let candidates = vec![
            candidate("c1", &[], &["LLM Inference"], 5),
            candidate("c2", &[], &["Web"], 5),
        ];
        let filters = CandidateFilters { domains_required: vec!["llm".to_string()], ..Default::default() };
        let result = apply_filters(&candidates, &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "c1");
    }

    #[test]
    fn hybrid_query_falls_back_within_deadline_when_vector_index_is_slow() {
        let kg = Arc::new(KnowledgeGraph::new(RelationalStore::open(":memory:").unwrap()));
        let embedder = LocalEmbedder::new(16);
        kg.add_candidate(candidate("c1", &["Rust"], &[], 5), &embedder).unwrap();
        kg.vector_index().set_artificial_search_delay(Some(Duration::from_millis(500)));

        let started = std::time::Instant::now();
        let result = hybrid_query_candidates(
            &kg,
            "t1",
            &CandidateFilters::default(),
            &embedder,
            "rust systems programmer",
            5,
            Duration::from_millis(50),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(result.len(), 1);
        assert!(result[0].similarity_score.is_none());
    }

    #[test]
    fn hybrid_query_attaches_similarity_when_vector_index_responds() {
        let kg = Arc::new(KnowledgeGraph::new(RelationalStore::open(":memory:").unwrap()));
        let embedder = LocalEmbedder::new(16);
        kg.add_candidate(candidate("c1", &["Rust"], &[], 5), &embedder).unwrap();

        let result = hybrid_query_candidates(
            &kg,
            "t1",
            &CandidateFilters::default(),
            &embedder,
            "rust systems programmer",
            5,
            Duration::from_secs(3),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].similarity_score.is_some());
    }
}
