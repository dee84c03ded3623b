//! Team and interviewer matching: multi-criteria
//! weighted scoring over candidate-to-team and candidate-to-interviewer
//! pairs, with a freshly-initialized bandit making the final selection
//! among the scored candidates so the same weighted components that
//! explain a match also drive *which* match actually gets picked
//! (grounded on `original_source/backend/matching/team_matcher.py`).

use serde::Serialize;

use crate::bandit::Bandit;
use crate::model::{Candidate, Interviewer, Team};

/// Piecewise arxiv research boost shared by both matchers.
pub fn arxiv_boost(c: &Candidate) -> f32 {
    let has_arxiv = !c.research.papers.is_empty()
        || c.research.arxiv_author_id.is_some()
        || c.research.orcid_id.is_some()
        || c.research.research_contributions.is_some();
    if !has_arxiv {
        return 0.0;
    }

    let mut boost = 0.0;
    if !c.research.papers.is_empty() || c.research.arxiv_author_id.is_some() || c.research.orcid_id.is_some() {
        boost += 0.3;
    }
    let paper_count = c.research.papers.len();
    if paper_count >= 20 {
        boost += 0.4;
    } else if paper_count >= 10 {
        boost += 0.3;
    } else if paper_count >= 5 {
        boost += 0.2;
    } else if paper_count >= 1 {
        boost += 0.1;
    }
    if c.research.research_contributions.is_some() {
        boost += 0.2;
    }
    if !c.research.research_areas.is_empty() {
        boost += 0.1;
    }
    boost.min(1.0)
}

fn needs_match(candidate: &Candidate, team: &Team) -> f32 {
    if team.needs.is_empty() {
        return 0.5;
    }
    let candidate_skills_lower: std::collections::BTreeSet<String> =
        candidate.skills.iter().map(|s| s.to_lowercase()).collect();
    let overlap = team
        .needs
        .iter()
        .filter(|need| candidate_skills_lower.contains(&need.to_lowercase()))
        .count();
    (overlap as f32 / team.needs.len() as f32).min(1.0)
}

fn expertise_match(candidate_domains: &std::collections::BTreeSet<String>, expertise: &std::collections::BTreeSet<String>) -> f32 {
    if expertise.is_empty() {
        return 0.5;
    }
    let domains_lower: std::collections::BTreeSet<String> = candidate_domains.iter().map(|d| d.to_lowercase()).collect();
    let overlap = expertise
        .iter()
        .filter(|e| domains_lower.contains(&e.to_lowercase()))
        .count();
    (overlap as f32 / expertise.len() as f32).min(1.0)
}

/// Per-team score breakdown, kept around so the reasoning string can pick
/// out which components cleared the display threshold.
#[derive(Debug, Clone)]
pub struct TeamMatchComponents {
    pub team_id: String,
    pub score: f32,
    pub similarity: f32,
    pub needs_match: f32,
    pub expertise_match: f32,
    pub arxiv_boost: f32,
    pub capacity_factor: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMatch {
    pub candidate_id: String,
    pub team_id: String,
    pub match_score: f32,
    pub similarity: f32,
    pub needs_match: f32,
    pub expertise_match: f32,
    pub arxiv_boost: f32,
    pub reasoning: String,
}

const DISPLAY_THRESHOLD: f32 = 0.2;

fn team_reasoning(team: &Team, c: &TeamMatchComponents) -> String {
    let mut parts = Vec::new();
    if c.similarity >= DISPLAY_THRESHOLD {
        parts.push(format!("Strong skill match ({:.2})", c.similarity));
    }
    if c.needs_match >= DISPLAY_THRESHOLD {
        parts.push(format!("Team needs match ({:.0}%)", c.needs_match * 100.0));
    }
    if c.expertise_match >= DISPLAY_THRESHOLD {
        parts.push(format!("Expertise overlap ({:.0}%)", c.expertise_match * 100.0));
    }
    if c.arxiv_boost >= DISPLAY_THRESHOLD {
        parts.push(format!("Relevant research background ({:.2})", c.arxiv_boost));
    }
    if c.capacity_factor >= DISPLAY_THRESHOLD {
        parts.push(format!("Team capacity ({:.2})", c.capacity_factor));
    }
    if parts.is_empty() {
        parts.push(format!("Moderate match (score: {:.2})", c.score));
    }
    format!("Matched to {}: {}", team.name, parts.join("; "))
}

/// Scores every team against `candidate`, then lets a freshly warm-started
/// bandit (arms = teams, priors = the composite scores) pick the winner.
pub fn match_to_team(
    candidate: &Candidate,
    teams: &[(Team, f32)],
    rng_seed: u64,
) -> Option<TeamMatch> {
    if teams.is_empty() {
        return None;
    }
    let components: Vec<TeamMatchComponents> = teams
        .iter()
        .map(|(team, similarity)| {
            let needs = needs_match(candidate, team);
            let expertise = expertise_match(&candidate.domains, &team.expertise);
            let arxiv = arxiv_boost(candidate);
            let open_positions = team.open_positions.len();
            let capacity_factor = if open_positions > 0 {
                (open_positions as f32 / 3.0).min(1.0)
            } else {
                0.5
            };
            let score = similarity * 0.30 + needs * 0.25 + expertise * 0.15 + arxiv * 0.25 + capacity_factor * 0.05;
            TeamMatchComponents {
                team_id: team.id.clone(),
                score,
                similarity: *similarity,
                needs_match: needs,
                expertise_match: expertise,
                arxiv_boost: arxiv,
                capacity_factor,
            }
        })
        .collect();

    let scores: Vec<f32> = components.iter().map(|c| c.score).collect();
    let mut bandit = Bandit::warm_start(&scores, 8.0, rng_seed);
    let selected = bandit.select();
    let best = &components[selected];
    let team = &teams[selected].0;

    Some(TeamMatch {
        candidate_id: candidate.id.clone(),
        team_id: best.team_id.clone(),
        match_score: best.score,
        similarity: best.similarity,
        needs_match: best.needs_match,
        expertise_match: best.expertise_match,
        arxiv_boost: best.arxiv_boost,
        reasoning: team_reasoning(team, best),
    })
}

#[derive(Debug, Clone)]
pub struct InterviewerMatchComponents {
    pub interviewer_id: String,
    pub score: f32,
    pub similarity: f32,
    pub expertise_match: f32,
    pub arxiv_boost: f32,
    pub success_rate: f32,
    pub cluster_success: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewerMatch {
    pub candidate_id: String,
    pub team_id: String,
    pub interviewer_id: String,
    pub match_score: f32,
    pub similarity: f32,
    pub expertise_match: f32,
    pub arxiv_boost: f32,
    pub success_rate: f32,
    pub cluster_success: f32,
    pub reasoning: String,
}

fn interviewer_reasoning(interviewer_id: &str, candidate: &Candidate, c: &InterviewerMatchComponents) -> String {
    let mut parts = Vec::new();
    if c.similarity >= DISPLAY_THRESHOLD {
        parts.push(format!("Strong skill match ({:.2})", c.similarity));
    }
    if c.expertise_match >= DISPLAY_THRESHOLD {
        parts.push(format!("Expertise match ({:.0}%)", c.expertise_match * 100.0));
    }
    if c.arxiv_boost >= DISPLAY_THRESHOLD {
        parts.push(format!("Relevant research background ({:.2})", c.arxiv_boost));
    }
    if c.success_rate >= DISPLAY_THRESHOLD {
        parts.push(format!("Success rate ({:.0}%)", c.success_rate * 100.0));
    }
    if let Some(cluster) = &candidate.ability_cluster {
        if c.cluster_success >= 0.6 {
            parts.push(format!("Strong track record with {cluster} candidates"));
        }
    }
    if parts.is_empty() {
        parts.push(format!("Moderate match (score: {:.2})", c.score));
    }
    format!("Matched to {interviewer_id}: {}", parts.join("; "))
}

/// Scores `team.member_ids` (resolved by the caller into `interviewers`)
/// against `candidate`, then a fresh warm-started bandit selects the winner.
pub fn match_to_person(
    candidate: &Candidate,
    team_id: &str,
    interviewers: &[(Interviewer, f32)],
    rng_seed: u64,
) -> Option<InterviewerMatch> {
    if interviewers.is_empty() {
        return None;
    }
    let components: Vec<InterviewerMatchComponents> = interviewers
        .iter()
        .map(|(interviewer, similarity)| {
            let expertise = expertise_match(&candidate.domains, &interviewer.expertise);
            let arxiv = arxiv_boost(candidate);
            let cluster_success = candidate
                .ability_cluster
                .as_deref()
                .map(|cluster| interviewer.cluster_success_rate(cluster))
                .unwrap_or(0.5);
            let score = similarity * 0.30
                + expertise * 0.20
                + arxiv * 0.25
                + interviewer.success_rate * 0.15
                + cluster_success * 0.10;
            InterviewerMatchComponents {
                interviewer_id: interviewer.id.clone(),
                score,
                similarity: *similarity,
                expertise_match: expertise,
                arxiv_boost: arxiv,
                success_rate: interviewer.success_rate,
                cluster_success,
            }
        })
        .collect();

    let scores: Vec<f32> = components.iter().map(|c| c.score).collect();
    let mut bandit = Bandit::warm_start(&scores, 8.0, rng_seed);
    let selected = bandit.select();
    let best = &components[selected];

    Some(InterviewerMatch {
        candidate_id: candidate.id.clone(),
        team_id: team_id.to_string(),
        interviewer_id: best.interviewer_id.clone(),
        match_score: best.score,
        similarity: best.similarity,
        expertise_match: best.expertise_match,
        arxiv_boost: best.arxiv_boost,
        success_rate: best.success_rate,
        cluster_success: best.cluster_success,
        reasoning: interviewer_reasoning(&best.interviewer_id, candidate, best),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Paper;

    fn researcher() -> Candidate {
        let mut c = Candidate::new("c1", "t1");
        c.research.papers = (0..12).map(|i| Paper { title: format!("p{i}"), venue: None }).collect();
        c.research.arxiv_author_id = Some("a1".into());
        c.research.research_contributions = Some("contribs".into());
        c.research.research_areas = ["nlp"].into_iter().map(String::from).collect();
        c
    }

    #[test]
    fn arxiv_boost_caps_at_one() {
        let c = researcher();
        assert!((arxiv_boost(&c) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn arxiv_boost_is_zero_with_no_research_signal() {
        let c = Candidate::new("c1", "t1");
        assert_eq!(arxiv_boost(&c), 0.0);
    }

    #[test]
    fn match_to_team_picks_among_scored_teams() {
        let candidate = researcher();
        let mut team_a = Team::new("a", "t1", "Platform");
        team_a.needs = ["nlp".into()].into_iter().collect();
        team_a.open_positions = ["p1".into(), "p2".into(), "p3".into()].into_iter().collect();
        let team_b = Team::new("b", "t1", "Infra");
        let result = match_to_team(&candidate, &[(team_a, 0.9), (team_b, 0.1)], 7).unwrap();
        assert!(!result.team_id.is_empty());
        assert!(result.reasoning.starts_with("Matched to"));
    }

    #[test]
    fn match_to_team_is_none_with_no_teams() {
        let candidate = Candidate::new("c1", "t1");
        assert!(match_to_team(&candidate, &[], 1).is_none());
    }
}
