//! Layered phone-screen decision engine, grounded on
//! `original_source/backend/interviews/phone_screen_engine.py`.
//!
//! Six gates run in a fixed pipeline order and short-circuit on the first
//! hard failure: must-haves, similarity, outlier detection, extracted-info
//! validation, bandit confidence, final weighted score.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bandit::Bandit;
use crate::model::{Candidate, ExpertiseLevel, Position};

/// Recruiter-supplied signals extracted from the phone-screen transcript.
/// `None` fields fall back to a neutral 0.5 plus a flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub motivation: Option<f32>,
    pub communication: Option<f32>,
    pub technical_depth: Option<f32>,
    pub cultural_fit: Option<f32>,
    /// Years of experience as independently extracted from the transcript,
    /// compared against `candidate.experience_years` for the critical
    /// outlier check.
    pub extracted_experience_years: Option<u32>,
    /// Skills as independently extracted from the transcript, compared
    /// against `candidate.skills` for the non-critical overlap check.
    pub extracted_skills: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub decision: Decision,
    pub confidence: f32,
    pub similarity: f32,
    pub bandit_confidence: f32,
    pub extracted_validation_score: f32,
    pub outlier_flags: Vec<String>,
    pub must_have_match: bool,
    pub missing_must_haves: Vec<String>,
    pub reasoning: String,
}

fn fail(
    confidence: f32,
    similarity: f32,
    flags: Vec<String>,
    missing_must_haves: Vec<String>,
    reasoning: String,
) -> DecisionResult {
    let must_have_match = missing_must_haves.is_empty();
    DecisionResult {
        decision: Decision::Fail,
        confidence,
        similarity,
        bandit_confidence: 0.0,
        extracted_validation_score: 0.0,
        outlier_flags: flags,
        must_have_match,
        missing_must_haves,
        reasoning,
    }
}

/// Domain -> skill keywords a candidate must show at least one of, to
/// support a claimed domain. Not exhaustive; unmatched domains never flag.
fn domain_support_keywords(domain: &str) -> Option<&'static [&'static str]> {
    match domain {
        "ml" | "machine learning" => Some(&["pytorch", "tensorflow", "ml", "machine learning"]),
        "llm inference" | "gpu" => Some(&["cuda", "pytorch", "tensorflow", "gpu", "inference"]),
        _ => None,
    }
}

/// Must-haves the candidate's skill set does not cover, in position order.
/// Exact match when `strictness >= 1.0`, substring either direction otherwise.
fn missing_must_haves(candidate: &Candidate, position: &Position, strictness: f32) -> Vec<String> {
    let candidate_skills_lower: Vec<String> = candidate.skills.iter().map(|s| s.to_lowercase()).collect();
    position
        .must_haves
        .iter()
        .filter(|must_have| {
            let must_have_lower = must_have.to_lowercase();
            let present = if strictness >= 1.0 {
                candidate_skills_lower.iter().any(|s| s == &must_have_lower)
            } else {
                candidate_skills_lower
                    .iter()
                    .any(|s| s.contains(&must_have_lower) || must_have_lower.contains(s.as_str()))
            };
            !present
        })
        .cloned()
        .collect()
}

fn detect_outliers(candidate: &Candidate, position: &Position, extracted: &ExtractedInfo) -> (Vec<String>, bool) {
    let mut flags = Vec::new();
    let mut critical = false;

    if candidate.expertise_level >= ExpertiseLevel::Senior && candidate.skills.len() < 5 {
        flags.push("experience_skill_mismatch".to_string());
    }

    for domain in &candidate.domains {
        if let Some(keywords) = domain_support_keywords(&domain.to_lowercase()) {
            let supported = candidate
                .skills
                .iter()
                .any(|skill| keywords.iter().any(|kw| skill.to_lowercase().contains(kw)));
            if !supported {
                flags.push("domain_skill_mismatch".to_string());
                break;
            }
        }
    }

    if let Some(extracted_years) = extracted.extracted_experience_years {
        let diff = (extracted_years as i64 - candidate.experience_years as i64).unsigned_abs();
        if diff > 2 {
            flags.push("critical_extracted_info_mismatch".to_string());
            critical = true;
        }
    }
    if let Some(extracted_skills) = &extracted.extracted_skills {
        if !extracted_skills.is_empty() {
            let overlap = extracted_skills.iter().filter(|s| candidate.skills.contains(*s)).count();
            if (overlap as f32) < extracted_skills.len() as f32 * 0.5 {
                flags.push("extracted_info_inconsistency".to_string());
            }
        }
    }

    if candidate.skills.len() > 20 && !position.must_haves.is_empty() && position.must_haves.iter().all(|mh| candidate.skills.contains(mh)) {
        flags.push("suspicious_pattern".to_string());
    }

    (flags, critical)
}

fn validate_extracted_info(extracted: &ExtractedInfo) -> (f32, Vec<String>) {
    if extracted.motivation.is_none()
        && extracted.communication.is_none()
        && extracted.technical_depth.is_none()
        && extracted.cultural_fit.is_none()
    {
        return (0.5, vec!["no_extracted_info".to_string()]);
    }

    let motivation = extracted.motivation.unwrap_or(0.5);
    let communication = extracted.communication.unwrap_or(0.5);
    let technical = extracted.technical_depth.unwrap_or(0.5);
    let cultural_fit = extracted.cultural_fit.unwrap_or(0.5);

    let score = motivation * 0.3 + communication * 0.2 + technical * 0.4 + cultural_fit * 0.1;

    let mut flags = Vec::new();
    if motivation < 0.4 {
        flags.push("low_motivation".to_string());
    }
    if communication < 0.4 {
        flags.push("poor_communication".to_string());
    }
    if technical < 0.5 {
        flags.push("insufficient_technical_depth".to_string());
    }

    (score, flags)
}

fn reasoning(
    similarity: f32,
    similarity_threshold: f32,
    bandit_confidence: f32,
    extracted_validated: bool,
    outlier_flags: &[String],
) -> String {
    let mut parts = Vec::new();
    parts.push(if similarity >= similarity_threshold {
        format!("Similarity gate passed ({similarity:.2})")
    } else {
        format!("Similarity gate failed ({similarity:.2})")
    });
    if bandit_confidence >= 0.7 {
        parts.push(format!("Bandit confidence strong ({bandit_confidence:.2})"));
    }
    if extracted_validated {
        parts.push("Extracted info validated".to_string());
    }
    if !outlier_flags.is_empty() {
        parts.push(format!("{} outlier flag(s): {}", outlier_flags.len(), outlier_flags.join(", ")));
    }
    parts.join("; ")
}

/// Runs the full six-layer pipeline for one candidate/position pair.
/// `similarity` is the caller-computed cosine similarity between the
/// candidate and position embeddings.
pub fn make_decision(
    candidate: &Candidate,
    position: &Position,
    similarity: f32,
    extracted: &ExtractedInfo,
    similarity_threshold: f32,
    confidence_threshold: f32,
    must_have_strictness: f32,
    bandit_rng_seed: u64,
) -> DecisionResult {
    // Layer 1: must-haves.
    let missing = missing_must_haves(candidate, position, must_have_strictness);
    if !missing.is_empty() || candidate.expertise_level < position.experience_level {
        return fail(
            0.0,
            similarity,
            Vec::new(),
            missing,
            "Failed must-have skills or experience-level gate".to_string(),
        );
    }

    // Layer 2: similarity gate.
    if similarity < similarity_threshold {
        return fail(
            0.0,
            similarity,
            Vec::new(),
            Vec::new(),
            reasoning(similarity, similarity_threshold, 0.0, false, &[]),
        );
    }

    // Layer 3: outlier detection.
    let (outlier_flags, critical_outlier) = detect_outliers(candidate, position, extracted);
    if critical_outlier {
        return fail(
            similarity * 0.5,
            similarity,
            outlier_flags.clone(),
            Vec::new(),
            reasoning(similarity, similarity_threshold, 0.0, false, &outlier_flags),
        );
    }

    // Layer 4: extracted-info validation.
    let (extracted_score, mut validation_flags) = validate_extracted_info(extracted);
    let extracted_validated = validation_flags.is_empty();
    let mut all_flags = outlier_flags;
    all_flags.append(&mut validation_flags);

    // Layer 5: bandit confidence, a single-arm bandit warm-started from similarity.
    let mut bandit = Bandit::warm_start(&[similarity], 8.0, bandit_rng_seed);
    let bandit_confidence = bandit.posterior_mean(0);

    // Layer 6: final weighted evaluation.
    let base_score = similarity * 0.40 + bandit_confidence * 0.30 + extracted_score * 0.20;
    let outlier_penalty = (all_flags.len() as f32 * 0.05).min(0.20);
    let final_score = base_score * (1.0 - outlier_penalty);
    let decision = if final_score >= confidence_threshold { Decision::Pass } else { Decision::Fail };

    DecisionResult {
        decision,
        confidence: final_score,
        similarity,
        bandit_confidence,
        extracted_validation_score: extracted_score,
        outlier_flags: all_flags.clone(),
        must_have_match: true,
        missing_must_haves: Vec::new(),
        reasoning: reasoning(similarity, similarity_threshold, bandit_confidence, extracted_validated, &all_flags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified_candidate() -> Candidate {
        let mut c = Candidate::new("c1", "t1");
        c.skills = ["rust", "systems", "networking"].into_iter().map(String::from).collect();
        c.expertise_level = ExpertiseLevel::Senior;
        c.experience_years = 7;
        c
    }

    fn open_position() -> Position {
        let mut p = Position::new("p1", "t1", "Backend Engineer");
        p.must_haves = ["rust"].into_iter().map(String::from).collect();
        p.experience_level = ExpertiseLevel::Mid;
        p
    }

    #[test]
    fn fails_fast_on_missing_must_have() {
        let mut candidate = qualified_candidate();
        candidate.skills = ["python"].into_iter().map(String::from).collect();
        let result = make_decision(&candidate, &open_position(), 0.9, &ExtractedInfo::default(), 0.65, 0.70, 1.0, 1);
        assert_eq!(result.decision, Decision::Fail);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn reports_every_missing_must_have() {
        let mut candidate = qualified_candidate();
        candidate.skills = ["Python", "Java"].into_iter().map(String::from).collect();
        let mut position = open_position();
        position.must_haves = ["CUDA", "C++", "PyTorch"].into_iter().map(String::from).collect();
        let result = make_decision(&candidate, &position, 0.9, &ExtractedInfo::default(), 0.65, 0.70, 1.0, 1);
        assert_eq!(result.decision, Decision::Fail);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.must_have_match);
        let mut missing = result.missing_must_haves.clone();
        missing.sort();
        assert_eq!(missing, vec!["C++".to_string(), "CUDA".to_string(), "PyTorch".to_string()]);
    }

    #[test]
    fn fails_below_similarity_threshold() {
        let result = make_decision(&qualified_candidate(), &open_position(), 0.5, &ExtractedInfo::default(), 0.65, 0.70, 1.0, 1);
        assert_eq!(result.decision, Decision::Fail);
    }

    #[test]
    fn passes_with_strong_signals() {
        let extracted = ExtractedInfo {
            motivation: Some(0.9),
            communication: Some(0.9),
            technical_depth: Some(0.9),
            cultural_fit: Some(0.9),
            extracted_experience_years: Some(7),
            extracted_skills: Some(qualified_candidate().skills),
        };
        let result = make_decision(&qualified_candidate(), &open_position(), 0.95, &extracted, 0.65, 0.70, 1.0, 1);
        assert_eq!(result.decision, Decision::Pass);
    }

    #[test]
    fn critical_experience_mismatch_fails_immediately() {
        let extracted = ExtractedInfo {
            extracted_experience_years: Some(20),
            ..Default::default()
        };
        let result = make_decision(&qualified_candidate(), &open_position(), 0.9, &extracted, 0.65, 0.70, 1.0, 1);
        assert_eq!(result.decision, Decision::Fail);
        assert!(result.outlier_flags.contains(&"critical_extracted_info_mismatch".to_string()));
    }
}
