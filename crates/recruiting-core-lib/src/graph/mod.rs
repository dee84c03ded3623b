//! Knowledge graph facade unifying the vector index and the relational
//! store.
//!
//! Candidate records are authoritative in an in-memory map guarded by an
//! `RwLock`; team, interviewer and position records are read through to the
//! relational store on every call rather than cached, since the relational
//! store is already their source of truth and a second cache would only
//! reintroduce the drift the dual-store design exists to avoid (grounded on
//! `original_source/backend/database/kg_crud.py`'s split between
//! metadata-store-authoritative and Postgres-authoritative classes).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::embed::Embedder;
use crate::error::{CoreError, CoreResult};
use crate::model::{Candidate, EntityClass, Interviewer, Position, Team};
use crate::relational::RelationalStore;
use crate::vector_index::VectorIndex;

/// Unifies the vector index and the relational store: deterministic UUIDs,
/// write-through, read routing, and a small relationship model.
pub struct KnowledgeGraph {
    vector_index: VectorIndex,
    relational: RelationalStore,
    candidates: RwLock<HashMap<String, Candidate>>,
}

impl KnowledgeGraph {
    pub fn new(relational: RelationalStore) -> Self {
        Self {
            vector_index: VectorIndex::new(),
            relational,
            candidates: RwLock::new(HashMap::new()),
        }
    }

    pub fn vector_index(&self) -> &VectorIndex {
        &self.vector_index
    }

    pub fn relational(&self) -> &RelationalStore {
        &self.relational
    }

    fn metadata_blob(entity: &impl serde::Serialize) -> CoreResult<serde_json::Value> {
        serde_json::to_value(entity).map_err(|e| CoreError::ValidationError(format!("encoding metadata: {e}")))
    }

    // ---------- Candidate ----------

    pub fn add_candidate(&self, candidate: Candidate, embedder: &dyn Embedder) -> CoreResult<String> {
        let vector = embedder.embed(EntityClass::Candidate, &candidate.embedding_text())?;
        let metadata = Self::metadata_blob(&candidate)?;
        self.vector_index.upsert(
            EntityClass::Candidate,
            &candidate.id,
            &candidate.tenant_id,
            vector,
            metadata,
            false,
        )?;
        let id = candidate.id.clone();
        self.candidates.write().unwrap().insert(id.clone(), candidate);
        Ok(id)
    }

    pub fn get_candidate(&self, id: &str, tenant_id: &str) -> CoreResult<Candidate> {
        let guard = self.candidates.read().unwrap();
        let candidate = guard.get(id).ok_or_else(|| CoreError::NotFound(format!("candidate:{id}")))?;
        if candidate.tenant_id != tenant_id {
            return Err(CoreError::TenantMismatch(format!("candidate:{id}")));
        }
        Ok(candidate.clone())
    }

    pub fn get_all_candidates(&self, tenant_id: &str) -> Vec<Candidate> {
        self.candidates
            .read()
            .unwrap()
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub fn update_candidate(
        &self,
        id: &str,
        tenant_id: &str,
        patch: impl FnOnce(&mut Candidate),
        embedder: &dyn Embedder,
    ) -> CoreResult<Candidate> {
        let updated = {
            let mut guard = self.candidates.write().unwrap();
            let candidate = guard.get_mut(id).ok_or_else(|| CoreError::NotFound(format!("candidate:{id}")))?;
            if candidate.tenant_id != tenant_id {
                return Err(CoreError::TenantMismatch(format!("candidate:{id}")));
            }
            patch(candidate);
            candidate.clone()
        };
        let vector = embedder.embed(EntityClass::Candidate, &updated.embedding_text())?;
        let metadata = Self::metadata_blob(&updated)?;
        self.vector_index
            .upsert(EntityClass::Candidate, id, tenant_id, vector, metadata, true)?;
        Ok(updated)
    }

    // ---------- Team (relational store is source of truth) ----------

    pub fn add_team(&self, team: Team, embedder: &dyn Embedder) -> CoreResult<String> {
        self.relational.upsert_team(&team)?;
        let vector = embedder.embed(EntityClass::Team, &team.embedding_text())?;
        let metadata = Self::metadata_blob(&team)?;
        self.vector_index
            .upsert(EntityClass::Team, &team.id, &team.tenant_id, vector, metadata, false)?;
        Ok(team.id)
    }

    pub fn get_team(&self, id: &str, tenant_id: &str) -> CoreResult<Team> {
        self.relational.get_team(id, tenant_id)
    }

    pub fn get_all_teams(&self, tenant_id: &str) -> CoreResult<Vec<Team>> {
        self.relational.get_all_teams(tenant_id)
    }

    pub fn update_team(
        &self,
        id: &str,
        tenant_id: &str,
        patch: impl FnOnce(&mut Team),
        embedder: &dyn Embedder,
    ) -> CoreResult<Team> {
        let mut team = self.relational.get_team(id, tenant_id)?;
        patch(&mut team);
        self.relational.upsert_team(&team)?;
        let vector = embedder.embed(EntityClass::Team, &team.embedding_text())?;
        let metadata = Self::metadata_blob(&team)?;
        self.vector_index.upsert(EntityClass::Team, id, tenant_id, vector, metadata, true)?;
        Ok(team)
    }

    pub fn get_team_members(&self, team_id: &str, tenant_id: &str) -> CoreResult<Vec<Interviewer>> {
        let team = self.relational.get_team(team_id, tenant_id)?;
        Ok(team
            .member_ids
            .iter()
            .filter_map(|id| self.relational.get_interviewer(id, tenant_id).ok())
            .collect())
    }

    pub fn get_team_positions(&self, team_id: &str, tenant_id: &str) -> CoreResult<Vec<Position>> {
        let team = self.relational.get_team(team_id, tenant_id)?;
        Ok(team
            .open_positions
            .iter()
            .filter_map(|id| self.relational.get_position(id, tenant_id).ok())
            .collect())
    }

    // ---------- Interviewer (relational store is source of truth) ----------

    pub fn add_interviewer(&self, interviewer: Interviewer, embedder: &dyn Embedder) -> CoreResult<String> {
        self.relational.upsert_interviewer(&interviewer)?;
        let vector = embedder.embed(EntityClass::Interviewer, &interviewer.embedding_text())?;
        let metadata = Self::metadata_blob(&interviewer)?;
        self.vector_index.upsert(
            EntityClass::Interviewer,
            &interviewer.id,
            &interviewer.tenant_id,
            vector,
            metadata,
            false,
        )?;
        Ok(interviewer.id)
    }

    pub fn get_interviewer(&self, id: &str, tenant_id: &str) -> CoreResult<Interviewer> {
        self.relational.get_interviewer(id, tenant_id)
    }

    pub fn get_all_interviewers(&self, tenant_id: &str) -> CoreResult<Vec<Interviewer>> {
        self.relational.get_all_interviewers(tenant_id)
    }

    pub fn update_interviewer(
        &self,
        id: &str,
        tenant_id: &str,
        patch: impl FnOnce(&mut Interviewer),
        embedder: &dyn Embedder,
    ) -> CoreResult<Interviewer> {
        let mut interviewer = self.relational.get_interviewer(id, tenant_id)?;
        patch(&mut interviewer);
        self.relational.upsert_interviewer(&interviewer)?;
        let vector = embedder.embed(EntityClass::Interviewer, &interviewer.embedding_text())?;
        let metadata = Self::metadata_blob(&interviewer)?;
        self.vector_index
            .upsert(EntityClass::Interviewer, id, tenant_id, vector, metadata, true)?;
        Ok(interviewer)
    }

    // ---------- Position (relational store is source of truth) ----------

    pub fn add_position(&self, position: Position, embedder: &dyn Embedder) -> CoreResult<String> {
        self.relational.upsert_position(&position)?;
        let vector = embedder.embed(EntityClass::Position, &position.embedding_text())?;
        let metadata = Self::metadata_blob(&position)?;
        self.vector_index.upsert(
            EntityClass::Position,
            &position.id,
            &position.tenant_id,
            vector,
            metadata,
            false,
        )?;
        Ok(position.id)
    }

    pub fn get_position(&self, id: &str, tenant_id: &str) -> CoreResult<Position> {
        self.relational.get_position(id, tenant_id)
    }

    pub fn get_all_positions(&self, tenant_id: &str) -> CoreResult<Vec<Position>> {
        self.relational.get_all_positions(tenant_id)
    }

    pub fn update_position(
        &self,
        id: &str,
        tenant_id: &str,
        patch: impl FnOnce(&mut Position),
        embedder: &dyn Embedder,
    ) -> CoreResult<Position> {
        let mut position = self.relational.get_position(id, tenant_id)?;
        patch(&mut position);
        self.relational.upsert_position(&position)?;
        let vector = embedder.embed(EntityClass::Position, &position.embedding_text())?;
        let metadata = Self::metadata_blob(&position)?;
        self.vector_index
            .upsert(EntityClass::Position, id, tenant_id, vector, metadata, true)?;
        Ok(position)
    }

    // ---------- Relationships ----------

    /// Links an interviewer to a team, idempotently: sets `interviewer.team_id`,
    /// adds the interviewer to `team.member_ids`, and re-embeds both. Repeating
    /// the call with the same arguments leaves the graph unchanged (grounded on
    /// `original_source/backend/database/kg_relationships.py::link_interviewer_to_team`).
    pub fn link_interviewer_to_team(
        &self,
        interviewer_id: &str,
        team_id: &str,
        tenant_id: &str,
        embedder: &dyn Embedder,
    ) -> CoreResult<()> {
        self.update_interviewer(
            interviewer_id,
            tenant_id,
            |i| i.team_id = Some(team_id.to_string()),
            embedder,
        )?;
        self.update_team(
            team_id,
            tenant_id,
            |t| {
                t.member_ids.insert(interviewer_id.to_string());
            },
            embedder,
        )?;
        Ok(())
    }

    /// Offline maintenance: walks the relational store's rows and re-upserts
    /// any vector missing relative to it. Never invoked on the request path
    /// best-effort; logs and continues past individual failures.
    pub fn reconcile(&self, tenant_id: &str, embedder: &dyn Embedder) -> CoreResult<usize> {
        let mut repaired = 0;
        for team in self.relational.get_all_teams(tenant_id)? {
            if self.vector_index.fetch_by_id(EntityClass::Team, &team.id).is_err() {
                let vector = embedder.embed(EntityClass::Team, &team.embedding_text())?;
                let metadata = Self::metadata_blob(&team)?;
                self.vector_index
                    .upsert(EntityClass::Team, &team.id, tenant_id, vector, metadata, true)?;
                repaired += 1;
            }
        }
        for interviewer in self.relational.get_all_interviewers(tenant_id)? {
            if self.vector_index.fetch_by_id(EntityClass::Interviewer, &interviewer.id).is_err() {
                let vector = embedder.embed(EntityClass::Interviewer, &interviewer.embedding_text())?;
                let metadata = Self::metadata_blob(&interviewer)?;
                self.vector_index.upsert(
                    EntityClass::Interviewer,
                    &interviewer.id,
                    tenant_id,
                    vector,
                    metadata,
                    true,
                )?;
                repaired += 1;
            }
        }
        for position in self.relational.get_all_positions(tenant_id)? {
            if self.vector_index.fetch_by_id(EntityClass::Position, &position.id).is_err() {
                let vector = embedder.embed(EntityClass::Position, &position.embedding_text())?;
                let metadata = Self::metadata_blob(&position)?;
                self.vector_index
                    .upsert(EntityClass::Position, &position.id, tenant_id, vector, metadata, true)?;
                repaired += 1;
            }
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::LocalEmbedder;

    fn kg() -> (KnowledgeGraph, LocalEmbedder) {
        (KnowledgeGraph::new(RelationalStore::open(":memory:").unwrap()), LocalEmbedder::new(16))
    }

    #[test]
    fn add_and_get_candidate_round_trips() {
        let (kg, embedder) = kg();
        let candidate = Candidate::new("c1", "t1");
        kg.add_candidate(candidate, &embedder).unwrap();
        let fetched = kg.get_candidate("c1", "t1").unwrap();
        assert_eq!(fetched.id, "c1");
        assert!(kg.vector_index().fetch_by_id(EntityClass::Candidate, "c1").is_ok());
    }

    #[test]
    fn link_interviewer_to_team_is_idempotent() {
        let (kg, embedder) = kg();
        kg.add_team(Team::new("team1", "t1", "Platform"), &embedder).unwrap();
        kg.add_interviewer(Interviewer::new("i1", "t1"), &embedder).unwrap();
        kg.link_interviewer_to_team("i1", "team1", "t1", &embedder).unwrap();
        kg.link_interviewer_to_team("i1", "team1", "t1", &embedder).unwrap();
        let team = kg.get_team("team1", "t1").unwrap();
        assert_eq!(team.member_count(), 1);
        assert_eq!(kg.get_interviewer("i1", "t1").unwrap().team_id.as_deref(), Some("team1"));
    }

    #[test]
    fn tenant_mismatch_is_reported() {
        let (kg, embedder) = kg();
        kg.add_candidate(Candidate::new("c1", "t1"), &embedder).unwrap();
        assert!(matches!(kg.get_candidate("c1", "t2"), Err(CoreError::TenantMismatch(_))));
    }
}
