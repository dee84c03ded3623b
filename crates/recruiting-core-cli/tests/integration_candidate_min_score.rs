use recruiting_core::model::Candidate;
use recruiting_core::{Config, RecruitingEngine};

/// Integration test: `find_exceptional_talent`'s `min_score` filter is
/// inclusive (`>=`) and actually drops candidates below the threshold,
/// rather than only sorting/truncating by `top_k`.
#[test]
fn integration_candidate_min_score() {
    let engine = RecruitingEngine::new(Config { relational_store_path: ":memory:".to_string(), ..Config::default() }).unwrap();

    let plain = Candidate::new("plain", "ignored");
    assert!(engine.add_candidate("tenant-a", plain).success);

    let mut exceptional = Candidate::new("exceptional", "ignored");
    exceptional.research.papers = (0..25)
        .map(|i| recruiting_core::model::Paper { title: format!("paper-{i}"), venue: None })
        .collect();
    exceptional.research.arxiv_author_id = Some("author-1".to_string());
    exceptional.github_stats.total_stars = 5000;
    exceptional.github_stats.total_repos = 40;
    exceptional.x_analytics.followers_count = 50_000;
    exceptional.x_analytics.avg_engagement_rate = 0.2;
    exceptional.x_analytics.content_quality_score = 0.9;
    assert!(engine.add_candidate("tenant-a", exceptional).success);

    // With no floor, both candidates are visible.
    let unfiltered = engine.find_exceptional_talent("tenant-a", None, 0.0, 10);
    assert!(unfiltered.success);
    assert_eq!(unfiltered.data.unwrap().len(), 2);

    // Find the exceptional candidate's own combined score, then verify the
    // min_score boundary: >= that score keeps it, > that score drops it.
    let scored = engine.score_candidate("tenant-a", "exceptional", None);
    assert!(scored.success);
    let best_score = scored.data.unwrap().combined_score;

    let at_threshold = engine.find_exceptional_talent("tenant-a", None, best_score, 10);
    assert!(at_threshold.success);
    let at_threshold = at_threshold.data.unwrap();
    assert!(at_threshold.iter().any(|r| r.candidate_id == "exceptional"));
    assert!(!at_threshold.iter().any(|r| r.candidate_id == "plain"));

    let above_threshold = engine.find_exceptional_talent("tenant-a", None, best_score + 1e-4, 10);
    assert!(above_threshold.success);
    assert!(above_threshold.data.unwrap().is_empty());
}
