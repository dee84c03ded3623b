use recruiting_core::model::{Candidate, Position};
use recruiting_core::{Config, RecruitingEngine};

/// Integration test: add a candidate and a position, then run the full
/// match/score/decide path end to end against a fresh in-memory engine.
///
/// This exercises the facade the CLI drives: add_candidate -> add_position
/// -> score_candidate -> make_phone_screen_decision -> process_feedback,
/// checking that state written by one call is visible to the next.
#[test]
fn integration_roundtrip() {
    let engine = RecruitingEngine::new(Config { relational_store_path: ":memory:".to_string(), ..Config::default() }).unwrap();

    let mut candidate = Candidate::new("cand-1", "ignored-tenant-field-overwritten");
    candidate.skills = ["rust".to_string(), "distributed systems".to_string()].into_iter().collect();
    candidate.experience_years = 6;
    let added = engine.add_candidate("tenant-a", candidate);
    assert!(added.success, "add_candidate failed: {:?}", added.error);

    let mut position = Position::new("pos-1", "ignored", "Staff Backend Engineer");
    position.must_haves = ["rust".to_string()].into_iter().collect();
    position.selected_candidates = vec!["cand-1".to_string()];
    let added = engine.add_position("tenant-a", position);
    assert!(added.success, "add_position failed: {:?}", added.error);

    let scored = engine.score_candidate("tenant-a", "cand-1", Some("pos-1"));
    assert!(scored.success, "score_candidate failed: {:?}", scored.error);

    let decision = engine.make_phone_screen_decision("tenant-a", "cand-1", "pos-1", None);
    assert!(decision.success, "make_phone_screen_decision failed: {:?}", decision.error);

    let feedback = engine.process_feedback("tenant-a", "cand-1", "pos-1", "Great candidate, strong technical depth, hire");
    assert!(feedback.success, "process_feedback failed: {:?}", feedback.error);
    assert_eq!(engine.learning_summary().total_interactions, 1);

    // Cross-tenant reads must not see tenant-a's data.
    let missing = engine.get_candidate("tenant-b", "cand-1");
    assert!(!missing.success);
    assert_eq!(missing.error.unwrap().kind, "not_found");
}
