//! In-process vector index: per-class store with idempotent upsert, deadlined search.
//!
//! Four per-class maps keyed by the deterministic `uuid5(class+":"+id)`,
//! guarded by a single `RwLock` each. The index's exact idempotency and
//! deadline semantics are part of the specified contract rather than an
//! external collaborator's behavior, which is why this core implements it
//! in-process instead of delegating to an external vector database
//! (mirrors `original_source/backend/database/vector_db_client.py`'s
//! per-class collection shape, minus the Weaviate transport).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::model::{EntityClass, embedding_record::embedding_uuid};

/// One stored vector plus its metadata, keyed internally by `uuid5`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVector {
    pub profile_id: String,
    pub tenant_id: String,
    pub vector: Vec<f32>,
    pub metadata_json: serde_json::Value,
}

/// A single search hit: similarity is `1 - distance` for a cosine-style
/// distance over unit-norm vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub profile_id: String,
    pub tenant_id: String,
    pub metadata_json: serde_json::Value,
    pub distance: f32,
    pub similarity: f32,
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
}

#[derive(Default)]
struct ClassStore {
    records: HashMap<Uuid, StoredVector>,
}

/// Four `RwLock`-guarded class stores, one per [`EntityClass`].
pub struct VectorIndex {
    candidate: RwLock<ClassStore>,
    team: RwLock<ClassStore>,
    interviewer: RwLock<ClassStore>,
    position: RwLock<ClassStore>,
    /// Artificial per-call delay, used only by tests exercising the hybrid
    /// search timeout fallback.
    artificial_delay: RwLock<Option<Duration>>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            candidate: RwLock::new(ClassStore::default()),
            team: RwLock::new(ClassStore::default()),
            interviewer: RwLock::new(ClassStore::default()),
            position: RwLock::new(ClassStore::default()),
            artificial_delay: RwLock::new(None),
        }
    }

    /// Test hook: makes every subsequent `search` sleep for `delay` before
    /// returning, to exercise the hybrid-search deadline fallback without a
    /// real unreachable backend.
    pub fn set_artificial_search_delay(&self, delay: Option<Duration>) {
        *self.artificial_delay.write().unwrap() = delay;
    }

    fn store(&self, class: EntityClass) -> &RwLock<ClassStore> {
        match class {
            EntityClass::Candidate => &self.candidate,
            EntityClass::Team => &self.team,
            EntityClass::Interviewer => &self.interviewer,
            EntityClass::Position => &self.position,
        }
    }

    /// Idempotent insert. If the UUID already exists and `force_replace` is
    /// `false`, this is a no-op returning success (concurrent racing inserts
    /// collapse to a single record). When `force_replace` is `true` (the
    /// `update_X` path), the existing record is overwritten.
    pub fn upsert(
        &self,
        class: EntityClass,
        profile_id: &str,
        tenant_id: &str,
        vector: Vec<f32>,
        metadata_json: serde_json::Value,
        force_replace: bool,
    ) -> CoreResult<()> {
        let key = embedding_uuid(class, profile_id);
        let mut guard = self.store(class).write().unwrap();
        if guard.records.contains_key(&key) && !force_replace {
            return Ok(());
        }
        guard.records.insert(
            key,
            StoredVector {
                profile_id: profile_id.to_string(),
                tenant_id: tenant_id.to_string(),
                vector,
                metadata_json,
            },
        );
        Ok(())
    }

    pub fn fetch_by_id(&self, class: EntityClass, profile_id: &str) -> CoreResult<StoredVector> {
        let key = embedding_uuid(class, profile_id);
        let guard = self.store(class).read().unwrap();
        guard
            .records
            .get(&key)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("{}:{profile_id}", class.as_str())))
    }

    pub fn delete(&self, class: EntityClass, profile_id: &str) -> CoreResult<()> {
        let key = embedding_uuid(class, profile_id);
        let mut guard = self.store(class).write().unwrap();
        guard
            .records
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("{}:{profile_id}", class.as_str())))
    }

    /// Nearest-neighbor search, descending similarity, applying the
    /// artificial delay hook before computing results.
    pub fn search(&self, class: EntityClass, query_vector: &[f32], k: usize) -> CoreResult<Vec<SearchHit>> {
        if let Some(delay) = *self.artificial_delay.read().unwrap() {
            std::thread::sleep(delay);
        }
        let guard = self.store(class).read().unwrap();
        let mut hits: Vec<SearchHit> = guard
            .records
            .values()
            .map(|r| {
                let distance = l2_distance(query_vector, &r.vector);
                SearchHit {
                    profile_id: r.profile_id.clone(),
                    tenant_id: r.tenant_id.clone(),
                    metadata_json: r.metadata_json.clone(),
                    distance,
                    similarity: (1.0 - distance).max(0.0),
                }
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        hits.truncate(k);
        Ok(hits)
    }

    /// Full scan of a class, up to `limit` records, in insertion-independent
    /// (hash-map) order.
    pub fn scan(&self, class: EntityClass, limit: usize) -> CoreResult<Vec<StoredVector>> {
        let guard = self.store(class).read().unwrap();
        Ok(guard.records.values().take(limit).cloned().collect())
    }

    /// Similarity search across all four classes, keyed by class, excluding
    /// the source record when searching its own class.
    pub fn similar_across_types(
        &self,
        class: EntityClass,
        profile_id: &str,
        k_per_class: usize,
    ) -> CoreResult<HashMap<EntityClass, Vec<SearchHit>>> {
        let source = self.fetch_by_id(class, profile_id)?;
        let mut out = HashMap::new();
        for target_class in EntityClass::ALL {
            let mut hits = self.search(target_class, &source.vector, k_per_class + 1)?;
            if target_class == class {
                hits.retain(|h| h.profile_id != profile_id);
            }
            hits.truncate(k_per_class);
            out.insert(target_class, hits);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_idempotent_without_force_replace() {
        let idx = VectorIndex::new();
        idx.upsert(
            EntityClass::Candidate,
            "c1",
            "t1",
            vec![1.0, 0.0],
            serde_json::json!({"v": 1}),
            false,
        )
        .unwrap();
        idx.upsert(
            EntityClass::Candidate,
            "c1",
            "t1",
            vec![0.0, 1.0],
            serde_json::json!({"v": 2}),
            false,
        )
        .unwrap();
        let fetched = idx.fetch_by_id(EntityClass::Candidate, "c1").unwrap();
        assert_eq!(fetched.vector, vec![1.0, 0.0]);
    }

    #[test]
    fn force_replace_overwrites() {
        let idx = VectorIndex::new();
        idx.upsert(EntityClass::Candidate, "c1", "t1", vec![1.0, 0.0], serde_json::json!({}), false)
            .unwrap();
        idx.upsert(EntityClass::Candidate, "c1", "t1", vec![0.0, 1.0], serde_json::json!({}), true)
            .unwrap();
        let fetched = idx.fetch_by_id(EntityClass::Candidate, "c1").unwrap();
        assert_eq!(fetched.vector, vec![0.0, 1.0]);
    }

    #[test]
    fn search_excludes_source_across_types() {
        let idx = VectorIndex::new();
        idx.upsert(EntityClass::Candidate, "c1", "t1", vec![1.0, 0.0], serde_json::json!({}), false)
            .unwrap();
        idx.upsert(EntityClass::Candidate, "c2", "t1", vec![0.9, 0.1], serde_json::json!({}), false)
            .unwrap();
        let results = idx.similar_across_types(EntityClass::Candidate, "c1", 5).unwrap();
        let candidates = &results[&EntityClass::Candidate];
        assert!(candidates.iter().all(|h| h.profile_id != "c1"));
        assert_eq!(candidates[0].profile_id, "c2");
    }

    #[test]
    fn fetch_missing_is_not_found() {
        let idx = VectorIndex::new();
        assert!(idx.fetch_by_id(EntityClass::Candidate, "missing").is_err());
    }
}
