//! Matching and scoring: team/interviewer matching,
//! the exceptional-talent scorer, and the phone-screen decision engine.

pub mod decision_engine;
pub mod exceptional_talent;
pub mod team_matcher;
