use serde::{Deserialize, Serialize};

use super::{Candidate, Interviewer, Position, Team};

/// The four vector-indexed classes. Replaces the duck-typed `class_name:
/// str` strings of the reference implementation with an exhaustively
/// matchable enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Candidate,
    Team,
    Interviewer,
    Position,
}

impl EntityClass {
    pub const ALL: [EntityClass; 4] = [
        EntityClass::Candidate,
        EntityClass::Team,
        EntityClass::Interviewer,
        EntityClass::Position,
    ];

    /// Canonical string form used in vector-index keys and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Candidate => "Candidate",
            EntityClass::Team => "Team",
            EntityClass::Interviewer => "Interviewer",
            EntityClass::Position => "Position",
        }
    }
}

/// Sum type replacing the reference implementation's duck-typed profile
/// records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entity {
    Candidate(Candidate),
    Team(Team),
    Interviewer(Interviewer),
    Position(Position),
}

impl Entity {
    pub fn class(&self) -> EntityClass {
        match self {
            Entity::Candidate(_) => EntityClass::Candidate,
            Entity::Team(_) => EntityClass::Team,
            Entity::Interviewer(_) => EntityClass::Interviewer,
            Entity::Position(_) => EntityClass::Position,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Candidate(c) => &c.id,
            Entity::Team(t) => &t.id,
            Entity::Interviewer(i) => &i.id,
            Entity::Position(p) => &p.id,
        }
    }

    pub fn tenant_id(&self) -> &str {
        match self {
            Entity::Candidate(c) => &c.tenant_id,
            Entity::Team(t) => &t.tenant_id,
            Entity::Interviewer(i) => &i.tenant_id,
            Entity::Position(p) => &p.tenant_id,
        }
    }

    pub fn embedding_text(&self) -> String {
        match self {
            Entity::Candidate(c) => c.embedding_text(),
            Entity::Team(t) => t.embedding_text(),
            Entity::Interviewer(i) => i.embedding_text(),
            Entity::Position(p) => p.embedding_text(),
        }
    }
}
