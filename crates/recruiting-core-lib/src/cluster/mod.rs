//! Ability clustering over candidate embeddings, grounded
//! on `original_source/backend/matching/talent_clusterer.py`.
//!
//! K-means runs directly on the candidate embedding vectors produced by the
//! [`crate::embed::Embedder`] (no separate spectral reduction, since
//! candidate embeddings are already a dense semantic space); auto-K
//! selection maximizes a hand-rolled silhouette score (the reference
//! implementation calls into `sklearn.metrics.silhouette_score`, which has
//! no equivalent crate in this stack) over `linfa`/`linfa-clustering` as the
//! K-means backend.

use std::collections::{BTreeMap, HashMap, HashSet};

use linfa::prelude::*;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::embed::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::graph::KnowledgeGraph;
use crate::model::Candidate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterStats {
    pub size: usize,
    pub dominant_skills: Vec<String>,
    pub dominant_domains: Vec<String>,
    pub avg_experience_years: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_assignments: BTreeMap<String, String>,
    pub cluster_statistics: BTreeMap<String, ClusterStats>,
    pub optimal_k: usize,
    pub silhouette_score: f32,
}

/// Holds the trained K-means centroids (in embedding space, labeled with the
/// human-readable cluster name) so [`Clusterer::assign_one`] can place a new
/// candidate without re-clustering everything.
#[derive(Default)]
pub struct Clusterer {
    k_min: usize,
    k_max: usize,
    n_init: usize,
    seed: u64,
    trained: Option<Vec<(String, Vec<f32>)>>,
}

impl Clusterer {
    pub fn new(k_min: usize, k_max: usize, n_init: usize, seed: u64) -> Self {
        Self { k_min, k_max, n_init, seed, trained: None }
    }

    /// Clusters `candidates` (each paired with its embedding in `vectors`,
    /// same order), names each cluster, and returns per-candidate
    /// assignments plus per-cluster statistics. Does not mutate the
    /// candidates themselves or the knowledge graph; the caller (the
    /// engine facade) applies `cluster_assignments` back onto each
    /// candidate's `ability_cluster` field.
    pub fn cluster_candidates(&mut self, candidates: &[Candidate], vectors: &[Vec<f32>]) -> CoreResult<ClusterSummary> {
        if candidates.len() != vectors.len() {
            return Err(CoreError::ValidationError(
                "candidates and vectors must be the same length".to_string(),
            ));
        }
        let n = candidates.len();
        if n < self.k_min {
            return Err(CoreError::ValidationError(format!(
                "not enough candidates for clustering: {n} < minimum {min}",
                min = self.k_min
            )));
        }

        let dim = vectors[0].len();
        let flat: Vec<f32> = vectors.iter().flat_map(|v| v.iter().copied()).collect();
        let matrix = Array2::from_shape_vec((n, dim), flat)
            .map_err(|e| CoreError::ValidationError(format!("assembling embedding matrix: {e}")))?;

        let optimal_k = self.determine_optimal_k(n, &matrix)?;
        let (labels, centroids) = run_kmeans(&matrix, optimal_k, self.n_init, self.seed)?;

        let distinct_labels: HashSet<usize> = labels.iter().copied().collect();
        let silhouette = if distinct_labels.len() > 1 { silhouette_score(&matrix, &labels) } else { 0.0 };

        let cluster_names = name_all_clusters(candidates, &labels, optimal_k);

        let mut cluster_assignments = BTreeMap::new();
        for (i, candidate) in candidates.iter().enumerate() {
            let name = &cluster_names[labels[i]];
            cluster_assignments.insert(candidate.id.clone(), name.clone());
        }

        let mut cluster_statistics = BTreeMap::new();
        for (label, name) in cluster_names.iter().enumerate() {
            let members: Vec<&Candidate> = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| labels[*i] == label)
                .map(|(_, c)| c)
                .collect();
            cluster_statistics.insert(
                name.clone(),
                ClusterStats {
                    size: members.len(),
                    dominant_skills: dominant_terms(members.iter().flat_map(|c| c.skills.iter().cloned()), 5),
                    dominant_domains: dominant_terms(members.iter().flat_map(|c| c.domains.iter().cloned()), 3),
                    avg_experience_years: if members.is_empty() {
                        0.0
                    } else {
                        members.iter().map(|c| c.experience_years as f32).sum::<f32>() / members.len() as f32
                    },
                },
            );
        }

        self.trained = Some(
            cluster_names
                .iter()
                .enumerate()
                .map(|(label, name)| (name.clone(), centroids.row(label).to_vec()))
                .collect(),
        );

        Ok(ClusterSummary {
            cluster_assignments,
            cluster_statistics,
            optimal_k,
            silhouette_score: silhouette,
        })
    }

    /// Assigns `vector` to the nearest trained centroid. Errors with
    /// [`CoreError::InvariantViolation`] if [`Clusterer::cluster_candidates`]
    /// has not yet been run.
    pub fn assign_one(&self, vector: &[f32]) -> CoreResult<String> {
        let trained = self
            .trained
            .as_ref()
            .ok_or_else(|| CoreError::InvariantViolation("assign_one called before cluster_candidates".to_string()))?;
        let mut best_name = None;
        let mut best_dist = f32::MAX;
        for (name, centroid) in trained {
            let dist = euclidean_slice(vector, centroid);
            if dist < best_dist {
                best_dist = dist;
                best_name = Some(name.clone());
            }
        }
        best_name.ok_or_else(|| CoreError::InvariantViolation("no trained clusters available".to_string()))
    }

    fn determine_optimal_k(&self, n: usize, matrix: &Array2<f32>) -> CoreResult<usize> {
        if n < self.k_max {
            let k = self.k_min.max(n / 2).max(1).min(n);
            return Ok(k);
        }
        let upper = self.k_max.min(n.saturating_sub(1));
        let mut best_k = self.k_min;
        let mut best_score = -1.0f32;
        for k in self.k_min..=upper {
            if k < 2 {
                continue;
            }
            let (labels, _) = run_kmeans(matrix, k, self.n_init, self.seed)?;
            let distinct: HashSet<usize> = labels.iter().copied().collect();
            if distinct.len() <= 1 {
                break;
            }
            let score = silhouette_score(matrix, &labels);
            if score > best_score {
                best_score = score;
                best_k = k;
            }
        }
        Ok(best_k)
    }
}

fn run_kmeans(matrix: &Array2<f32>, k: usize, n_init: usize, seed: u64) -> CoreResult<(Array1<usize>, Array2<f32>)> {
    let targets = Array1::<usize>::zeros(matrix.nrows());
    let dataset = linfa::Dataset::new(matrix.clone(), targets);
    let rng = StdRng::seed_from_u64(seed);
    let model = KMeans::params_with_rng(k, rng)
        .n_runs(n_init.max(1))
        .max_n_iterations(300)
        .fit(&dataset)
        .map_err(|e| CoreError::InvariantViolation(format!("k-means fit failed: {e}")))?;
    let labels = model.predict(&dataset);
    Ok((labels, model.centroids().clone()))
}

fn euclidean_row(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

fn euclidean_slice(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

/// Mean silhouette coefficient over every row. `O(n^2)`, fine for the
/// candidate-pool sizes this clusterer runs over (batch job, not request
/// path).
fn silhouette_score(matrix: &Array2<f32>, labels: &Array1<usize>) -> f32 {
    let n = matrix.nrows();
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0f32;
    for i in 0..n {
        let own = labels[i];
        let mut same_sum = 0.0f32;
        let mut same_count = 0usize;
        let mut other_sums: HashMap<usize, (f32, usize)> = HashMap::new();
        for j in 0..n {
            if i == j {
                continue;
            }
            let dist = euclidean_row(matrix.row(i), matrix.row(j));
            if labels[j] == own {
                same_sum += dist;
                same_count += 1;
            } else {
                let entry = other_sums.entry(labels[j]).or_insert((0.0, 0));
                entry.0 += dist;
                entry.1 += 1;
            }
        }
        let a = if same_count > 0 { same_sum / same_count as f32 } else { 0.0 };
        let b = other_sums
            .values()
            .map(|(sum, count)| sum / *count as f32)
            .fold(f32::MAX, f32::min);
        let b = if b == f32::MAX { 0.0 } else { b };
        let s = if a.max(b) > 0.0 { (b - a) / a.max(b) } else { 0.0 };
        total += s;
    }
    total / n as f32
}

/// Frequency-ranked terms (skills or domains), first-seen order breaking
/// ties, mirroring `collections.Counter.most_common`.
fn dominant_terms(items: impl Iterator<Item = String>, top_n: usize) -> Vec<String> {
    ranked_counts(items).into_iter().take(top_n).map(|(term, _)| term).collect()
}

fn ranked_counts(items: impl Iterator<Item = String>) -> Vec<(String, usize)> {
    let mut order = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items {
        counts.entry(item.clone()).or_insert_with(|| {
            order.push(item.clone());
            0
        });
        *counts.get_mut(&item).unwrap() += 1;
    }
    let mut ranked: Vec<(String, usize)> = order.into_iter().map(|term| { let c = counts[&term]; (term, c) }).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

fn name_all_clusters(candidates: &[Candidate], labels: &Array1<usize>, k: usize) -> Vec<String> {
    (0..k)
        .map(|label| {
            let members: Vec<&Candidate> = candidates
                .iter()
                .enumerate()
                .filter(|(i, _)| labels[*i] == label)
                .map(|(_, c)| c)
                .collect();
            name_cluster(&members)
        })
        .collect()
}

/// Dominant-feature cluster naming: domain-based naming
/// wins over skill-based naming, which wins over an experience-tier
/// fallback; a term counts as "dominant" once it appears in at least 40% of
/// the cluster's members.
fn name_cluster(members: &[&Candidate]) -> String {
    if members.is_empty() {
        return "Unassigned".to_string();
    }

    let skill_counts = ranked_counts(members.iter().flat_map(|c| c.skills.iter().cloned()));
    let domain_counts = ranked_counts(members.iter().flat_map(|c| c.domains.iter().cloned()));
    let threshold = (members.len() as f32 * 0.4).max(1.0);

    let dominant_domains: Vec<&String> = domain_counts.iter().filter(|(_, c)| *c as f32 >= threshold).map(|(s, _)| s).collect();
    if !dominant_domains.is_empty() {
        let top_domain = &domain_counts[0].0;
        return if top_domain.contains("LLM") || top_domain.contains("Inference") {
            "LLM Inference Engineers".to_string()
        } else if top_domain.contains("GPU") || top_domain.contains("CUDA") {
            "GPU Computing Experts".to_string()
        } else if top_domain.contains("ML") || top_domain.contains("Machine Learning") {
            "ML Engineers".to_string()
        } else {
            format!("{top_domain} Specialists")
        };
    }

    let dominant_skills: Vec<&String> = skill_counts.iter().filter(|(_, c)| *c as f32 >= threshold).map(|(s, _)| s).collect();
    if !dominant_skills.is_empty() {
        if dominant_skills.iter().any(|s| s.contains("CUDA")) {
            return "CUDA/GPU Experts".to_string();
        } else if dominant_skills.iter().any(|s| s.contains("React") || s.contains("Node")) {
            return "Fullstack Developers".to_string();
        } else if dominant_skills.iter().any(|s| s.contains("PyTorch") || s.contains("TensorFlow")) {
            return "Deep Learning Engineers".to_string();
        } else if dominant_skills.iter().any(|s| s.contains("Kubernetes") || s.contains("Docker")) {
            return "DevOps Engineers".to_string();
        }
        let top_skills: Vec<String> = skill_counts.iter().take(2).map(|(s, _)| s.clone()).collect();
        return format!("{} Specialists", top_skills.join("/"));
    }

    let avg_exp = members.iter().map(|c| c.experience_years as f32).sum::<f32>() / members.len() as f32;
    if avg_exp >= 7.0 {
        "Senior Engineers".to_string()
    } else if avg_exp >= 4.0 {
        "Mid-Level Engineers".to_string()
    } else {
        "Junior Engineers".to_string()
    }
}

/// Recomputes every interviewer's `cluster_success_rates` from their
/// `interview_history`, grouping by each candidate's *current* cluster
/// label at read time (not the label at interview time), mirroring
/// `talent_clusterer.py::update_interviewer_cluster_rates`. Interviewers
/// with no interview history, or whose history yields no clustered
/// candidates, are left untouched.
pub fn update_interviewer_cluster_rates(
    kg: &KnowledgeGraph,
    tenant_id: &str,
    embedder: &dyn Embedder,
) -> CoreResult<BTreeMap<String, BTreeMap<String, f32>>> {
    let mut all_rates = BTreeMap::new();
    for interviewer in kg.get_all_interviewers(tenant_id)? {
        if interviewer.interview_history.is_empty() {
            continue;
        }
        let mut counts: BTreeMap<String, (u32, u32)> = BTreeMap::new();
        for outcome in &interviewer.interview_history {
            let Ok(candidate) = kg.get_candidate(&outcome.candidate_id, tenant_id) else {
                continue;
            };
            let Some(cluster) = candidate.ability_cluster else {
                continue;
            };
            let entry = counts.entry(cluster).or_insert((0, 0));
            entry.1 += 1;
            if outcome.result {
                entry.0 += 1;
            }
        }
        if counts.is_empty() {
            continue;
        }
        let rates: BTreeMap<String, f32> = counts
            .into_iter()
            .map(|(cluster, (successes, total))| {
                let rate = if total > 0 { successes as f32 / total as f32 } else { 0.5 };
                (cluster, rate)
            })
            .collect();
        let rates_for_update = rates.clone();
        kg.update_interviewer(
            &interviewer.id,
            tenant_id,
            move |i| i.cluster_success_rates = rates_for_update,
            embedder,
        )?;
        all_rates.insert(interviewer.id.clone(), rates);
    }
    Ok(all_rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate_with(id: &str, skills: &[&str], domains: &[&str], experience_years: u32) -> Candidate {
        let mut c = Candidate::new(id, "t1");
        c.skills = skills.iter().map(|s| s.to_string()).collect();
        c.domains = domains.iter().map(|s| s.to_string()).collect();
        c.experience_years = experience_years;
        c
    }

    /// Two well-separated blobs in a toy 4-d space so K-means trivially
    /// recovers the two groups regardless of embedding backend
    /// the clusterer has not been trained.
    fn cuda_and_fullstack_fixture() -> (Vec<Candidate>, Vec<Vec<f32>>) {
        let cuda = ["CUDA", "C++", "GPU"];
        let web = ["React", "Node.js"];
        let mut candidates = Vec::new();
        let mut vectors = Vec::new();
        for i in 0..5 {
            candidates.push(candidate_with(&format!("cuda{i}"), &cuda, &["GPU Computing"], 6));
            vectors.push(vec![1.0, 0.0, 0.0, 0.0]);
        }
        for i in 0..5 {
            candidates.push(candidate_with(&format!("web{i}"), &web, &["Web"], 3));
            vectors.push(vec![0.0, 1.0, 0.0, 0.0]);
        }
        (candidates, vectors)
    }

    #[test]
    fn clusters_two_well_separated_groups_and_names_them() {
        let (candidates, vectors) = cuda_and_fullstack_fixture();
        let mut clusterer = Clusterer::new(2, 2, 3, 42);
        let summary = clusterer.cluster_candidates(&candidates, &vectors).unwrap();
        assert_eq!(summary.optimal_k, 2);
        let names: HashSet<&String> = summary.cluster_assignments.values().collect();
        assert!(names.iter().any(|n| n.contains("CUDA/GPU")));
        assert!(names.iter().any(|n| n.contains("Fullstack")));
        assert_eq!(summary.cluster_statistics.len(), 2);
    }

    #[test]
    fn assign_one_requires_prior_training() {
        let clusterer = Clusterer::new(2, 5, 3, 42);
        assert!(matches!(clusterer.assign_one(&[0.0, 0.0]), Err(CoreError::InvariantViolation(_))));
    }

    #[test]
    fn assign_one_picks_nearest_trained_centroid() {
        let (candidates, vectors) = cuda_and_fullstack_fixture();
        let mut clusterer = Clusterer::new(2, 2, 3, 42);
        clusterer.cluster_candidates(&candidates, &vectors).unwrap();
        let label = clusterer.assign_one(&[0.95, 0.05, 0.0, 0.0]).unwrap();
        assert!(label.contains("CUDA/GPU"));
    }

    #[test]
    fn too_few_candidates_is_a_validation_error() {
        let (candidates, vectors) = cuda_and_fullstack_fixture();
        let mut clusterer = Clusterer::new(20, 25, 3, 42);
        assert!(matches!(
            clusterer.cluster_candidates(&candidates[..3], &vectors[..3]),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn update_interviewer_cluster_rates_reads_current_candidate_labels() {
        use crate::embed::LocalEmbedder;
        use crate::model::{Interviewer, InterviewOutcome};
        use crate::relational::RelationalStore;

        let kg = KnowledgeGraph::new(RelationalStore::open(":memory:").unwrap());
        let embedder = LocalEmbedder::new(16);

        let mut candidate = Candidate::new("c1", "t1");
        candidate.ability_cluster = Some("CUDA/GPU Experts".to_string());
        kg.add_candidate(candidate, &embedder).unwrap();

        let mut interviewer = Interviewer::new("i1", "t1");
        interviewer.interview_history = vec![
            InterviewOutcome { candidate_id: "c1".to_string(), result: true },
            InterviewOutcome { candidate_id: "c1".to_string(), result: false },
        ];
        kg.add_interviewer(interviewer, &embedder).unwrap();

        let rates = update_interviewer_cluster_rates(&kg, "t1", &embedder).unwrap();
        let i1_rates = &rates["i1"];
        assert_eq!(i1_rates["CUDA/GPU Experts"], 0.5);
    }
}
