//! Multi-signal "exceptional talent" scorer: four platform signals plus a
//! cross-platform composite, combined under multiplicative strictness gates
//! so that only candidates strong across *several* signals score highly
//! cross-platform multiplicative gate.

use serde::{Deserialize, Serialize};

use crate::model::Candidate;

/// Thresholds and ramp endpoints for the four platform signals. Every field
/// here is a named constant in the reference scorer; kept as config so the
/// gate behavior can be tuned without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionalThresholds {
    pub arxiv_min_papers: u32,
    pub arxiv_max_papers: u32,
    pub arxiv_min_contributions: u32,
    pub github_min_stars: u64,
    pub github_max_stars: u64,
    pub github_min_repos: u64,
    pub github_min_languages: u32,
    pub x_min_followers: u64,
    pub x_max_followers: u64,
    pub x_min_engagement_rate: f32,
    pub phone_min_technical_depth: f32,
    pub phone_max_technical_depth: f32,
    pub phone_min_problem_solving: f32,
    pub phone_min_communication: f32,
}

impl Default for ExceptionalThresholds {
    fn default() -> Self {
        Self {
            arxiv_min_papers: 25,
            arxiv_max_papers: 100,
            arxiv_min_contributions: 5,
            github_min_stars: 20_000,
            github_max_stars: 200_000,
            github_min_repos: 30,
            github_min_languages: 5,
            x_min_followers: 50_000,
            x_max_followers: 2_000_000,
            x_min_engagement_rate: 0.08,
            phone_min_technical_depth: 0.92,
            phone_max_technical_depth: 0.99,
            phone_min_problem_solving: 0.90,
            phone_min_communication: 0.90,
        }
    }
}

/// Raw counts that drove each signal, surfaced for the caller's own display
/// logic rather than baked into `why_exceptional`'s prose.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Evidence {
    pub paper_count: u32,
    pub star_count: u64,
    pub follower_count: u64,
    pub phone_screen_present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionalScore {
    pub arxiv_signal: f32,
    pub github_signal: f32,
    pub x_signal: f32,
    pub phone_screen_signal: f32,
    pub composite_signal: f32,
    pub base_score: f32,
    pub exceptional_score: f32,
    /// Set only when a position was supplied to [`score`].
    pub position_fit: Option<f32>,
    /// `exceptional_score * position_fit`, further gated; equals
    /// `exceptional_score` when no position was supplied.
    pub combined_score: f32,
    pub evidence: Evidence,
    pub why_exceptional: String,
}

fn log_ramp(value: f64, floor: f64, ceiling: f64) -> f32 {
    if value < floor {
        return 0.0;
    }
    let numerator = (value / floor + 1.0).ln();
    let denominator = (ceiling / floor + 1.0).ln();
    ((numerator / denominator) as f32).clamp(0.0, 1.0)
}

fn arxiv_signal(c: &Candidate, t: &ExceptionalThresholds) -> f32 {
    let paper_count = c.research.papers.len() as u32;
    if paper_count == 0 {
        return 0.0;
    }
    let paper_signal = if paper_count < t.arxiv_min_papers {
        0.0
    } else {
        log_ramp(
            paper_count as f64,
            t.arxiv_min_papers as f64,
            t.arxiv_max_papers as f64,
        )
    };
    // The reference implementation scales this by a contribution *count*;
    // this model carries `research_contributions` as free text, so presence
    // stands in for "meets the minimum contribution depth".
    let contributions_signal = if c.research.research_contributions.is_some() { 1.0 } else { 0.0 };
    let areas_signal = (c.research.research_areas.len() as f32 / 5.0).min(1.0);
    paper_signal * 0.50 + contributions_signal * 0.30 + areas_signal * 0.20
}

fn github_signal(c: &Candidate, t: &ExceptionalThresholds) -> f32 {
    let stars = c.github_stats.total_stars;
    let repos = c.github_stats.total_repos;
    if stars == 0 && repos == 0 {
        return 0.0;
    }
    let stars_signal = if stars < t.github_min_stars {
        0.0
    } else {
        log_ramp(stars as f64, t.github_min_stars as f64, t.github_max_stars as f64)
    };
    let repos_signal = if repos < t.github_min_repos {
        0.0
    } else {
        (repos as f32 / 50.0).min(1.0)
    };
    let languages_signal = (c.github_stats.languages.len() as f32 / t.github_min_languages as f32).min(1.0);
    stars_signal * 0.60 + repos_signal * 0.25 + languages_signal * 0.15
}

fn x_signal(c: &Candidate, t: &ExceptionalThresholds) -> f32 {
    let followers = c.x_analytics.followers_count;
    if followers == 0 {
        return 0.0;
    }
    let followers_signal = if followers < t.x_min_followers {
        0.0
    } else {
        log_ramp(followers as f64, t.x_min_followers as f64, t.x_max_followers as f64)
    };
    let engagement_signal = if c.x_analytics.avg_engagement_rate < t.x_min_engagement_rate {
        0.0
    } else {
        (c.x_analytics.avg_engagement_rate / 0.10).min(1.0)
    };
    let content_signal = ((c.x_analytics.content_quality_score - 0.5) * 2.0).max(0.0);
    followers_signal * 0.50 + engagement_signal * 0.30 + content_signal * 0.20
}

fn phone_screen_signal(c: &Candidate, t: &ExceptionalThresholds) -> f32 {
    let Some(p) = &c.phone_screen_results else {
        return 0.0;
    };
    let depth_signal = if p.technical_depth < t.phone_min_technical_depth {
        0.0
    } else {
        ((p.technical_depth - t.phone_min_technical_depth)
            / (t.phone_max_technical_depth - t.phone_min_technical_depth))
            .clamp(0.0, 1.0)
    };
    let problem_signal = ((p.problem_solving - t.phone_min_problem_solving) / (1.0 - t.phone_min_problem_solving)).max(0.0);
    let comm_signal = ((p.communication - t.phone_min_communication) / (1.0 - t.phone_min_communication)).max(0.0);
    let impl_signal = ((p.implementation - 0.85) / 0.15).max(0.0);
    depth_signal * 0.40 + problem_signal * 0.25 + comm_signal * 0.20 + impl_signal * 0.15
}

fn composite_signal(arxiv: f32, github: f32, x: f32, phone: f32) -> f32 {
    let research_production = if arxiv > 0.5 && github > 0.5 { (arxiv + github) / 2.0 } else { 0.0 };
    let cross_influence = if x > 0.5 && github > 0.5 { (x + github) / 2.0 } else { 0.0 };
    let technical_validation = if phone > 0.5 && arxiv > 0.5 { (phone + arxiv) / 2.0 } else { 0.0 };
    let strong_count = [arxiv, github, x, phone].iter().filter(|&&s| s > 0.8).count();
    let all_platform = if strong_count >= 4 { 1.0 } else { 0.0 };
    research_production * 0.30 + cross_influence * 0.25 + technical_validation * 0.25 + all_platform * 0.20
}

fn position_fit(c: &Candidate, position: &crate::model::Position, similarity: f32) -> f32 {
    let required_match = if position.required_skills.is_empty() {
        1.0
    } else {
        let overlap = position
            .required_skills
            .iter()
            .filter(|s| c.skills.contains(*s))
            .count();
        overlap as f32 / position.required_skills.len() as f32
    };
    let optional_match = if position.optional_skills.is_empty() {
        1.0
    } else {
        let overlap = position
            .optional_skills
            .iter()
            .filter(|s| c.skills.contains(*s))
            .count();
        overlap as f32 / position.optional_skills.len() as f32
    };
    let skills_match = required_match * 0.7 + optional_match * 0.3;

    let domain_match = if position.domains.is_empty() {
        0.5
    } else {
        let overlap = position.domains.iter().filter(|d| c.domains.contains(*d)).count();
        overlap as f32 / position.domains.len() as f32
    };

    use crate::model::ExpertiseLevel::*;
    let level_match = match (position.experience_level, c.expertise_level) {
        (Junior, cl) if cl > Junior && c.experience_years > 5 => 0.7,
        (Senior, _) if c.experience_years < 5 => 0.6,
        (Staff, _) if c.experience_years < 10 => 0.5,
        (Principal, _) if c.experience_years < 15 => 0.6,
        _ => 1.0,
    };

    similarity * 0.40 + skills_match * 0.30 + domain_match * 0.20 + level_match * 0.10
}

fn why_exceptional(c: &Candidate, arxiv: f32, github: f32, x: f32, phone: f32) -> String {
    let mut ranked = vec![
        ("arxiv", arxiv),
        ("github", github),
        ("x", x),
        ("phone", phone),
    ];
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let mut reasons = Vec::new();
    for (signal, score) in ranked {
        if score < 0.75 {
            continue;
        }
        let reason = match signal {
            "arxiv" => format!(
                "Exceptional research output ({} papers)",
                c.research.papers.len()
            ),
            "github" => format!(
                "Exceptional open-source impact ({} stars)",
                c.github_stats.total_stars
            ),
            "x" => format!(
                "Exceptional public influence ({} followers)",
                c.x_analytics.followers_count
            ),
            "phone" => "Phone screen validated exceptional technical depth".to_string(),
            _ => unreachable!(),
        };
        reasons.push(reason);
    }

    if reasons.is_empty() {
        "Strong but not yet exceptional across measured signals".to_string()
    } else {
        reasons.join("; ")
    }
}

/// Score a candidate's exceptional-talent signals, optionally combined with
/// fit against a specific position.
pub fn score(
    candidate: &Candidate,
    position: Option<(&crate::model::Position, f32)>,
    thresholds: &ExceptionalThresholds,
) -> ExceptionalScore {
    let arxiv = arxiv_signal(candidate, thresholds);
    let github = github_signal(candidate, thresholds);
    let x = x_signal(candidate, thresholds);
    let phone = phone_screen_signal(candidate, thresholds);
    let composite = composite_signal(arxiv, github, x, phone);

    let base = arxiv * 0.30 + github * 0.25 + x * 0.15 + phone * 0.20 + composite * 0.10;

    let signals = [arxiv, github, x, phone];
    let strong_count = signals.iter().filter(|&&s| s >= 0.75).count();
    let weak_count = signals.iter().filter(|&&s| s < 0.4).count();

    let mut exceptional = match strong_count {
        0 | 1 | 2 => base * 0.3,
        3 => base * 0.8,
        _ => base,
    };
    if weak_count > 0 {
        exceptional *= 0.5;
    }
    if arxiv < 0.5 || github < 0.5 {
        exceptional *= 0.6;
    }

    let (fit, combined) = match position {
        Some((position, similarity)) => {
            let fit = position_fit(candidate, position, similarity);
            let mut combined = exceptional * fit;
            if exceptional < 0.85 || fit < 0.85 {
                combined *= 0.7;
            }
            (Some(fit), combined)
        }
        None => (None, exceptional),
    };

    ExceptionalScore {
        arxiv_signal: arxiv,
        github_signal: github,
        x_signal: x,
        phone_screen_signal: phone,
        composite_signal: composite,
        base_score: base,
        exceptional_score: exceptional,
        position_fit: fit,
        combined_score: combined,
        evidence: Evidence {
            paper_count: candidate.research.papers.len() as u32,
            star_count: candidate.github_stats.total_stars,
            follower_count: candidate.x_analytics.followers_count,
            phone_screen_present: candidate.phone_screen_results.is_some(),
        },
        why_exceptional: why_exceptional(candidate, arxiv, github, x, phone),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GithubStats, Paper, PhoneScreenResults, ResearchProfile, XAnalytics};

    fn exceptional_candidate() -> Candidate {
        let mut c = Candidate::new("c1", "t1");
        c.research = ResearchProfile {
            papers: (0..90).map(|i| Paper { title: format!("p{i}"), venue: None }).collect(),
            arxiv_author_id: Some("a1".into()),
            orcid_id: None,
            research_contributions: Some("core algorithm".into()),
            research_areas: ["nlp", "rl", "systems", "vision", "optimization"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        c.github_stats = GithubStats {
            total_stars: 150_000,
            total_repos: 45,
            languages: ["rust", "python", "c++", "go", "zig"].into_iter().map(String::from).collect(),
        };
        c.x_analytics = XAnalytics {
            followers_count: 800_000,
            avg_engagement_rate: 0.09,
            content_quality_score: 0.9,
        };
        c.phone_screen_results = Some(PhoneScreenResults {
            technical_depth: 0.97,
            problem_solving: 0.95,
            communication: 0.93,
            implementation: 0.92,
        });
        c
    }

    #[test]
    fn four_strong_signals_take_no_penalty() {
        let c = exceptional_candidate();
        let s = score(&c, None, &ExceptionalThresholds::default());
        assert!(s.arxiv_signal > 0.75);
        assert!(s.github_signal > 0.75);
        assert!(s.x_signal > 0.75);
        assert!(s.phone_screen_signal > 0.75);
        assert!((s.exceptional_score - s.base_score).abs() < 1e-6);
    }

    #[test]
    fn weak_phone_signal_gates_the_score() {
        let mut c = exceptional_candidate();
        c.phone_screen_results = Some(PhoneScreenResults {
            technical_depth: 0.3,
            problem_solving: 0.3,
            communication: 0.3,
            implementation: 0.1,
        });
        let s = score(&c, None, &ExceptionalThresholds::default());
        assert!(s.phone_screen_signal < 0.4);
        assert!(s.exceptional_score <= s.base_score * 0.5 + 1e-6);
    }

    #[test]
    fn no_signals_scores_zero() {
        let c = Candidate::new("empty", "t1");
        let s = score(&c, None, &ExceptionalThresholds::default());
        assert_eq!(s.exceptional_score, 0.0);
        assert_eq!(s.why_exceptional, "Strong but not yet exceptional across measured signals");
    }
}
