use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityClass;

/// `(class, profile_id) -> (vector, metadata, tenant_id)`, keyed by the
/// deterministic `uuid5(class + ":" + profile_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub class: EntityClass,
    pub profile_id: String,
    pub tenant_id: String,
    pub vector: Vec<f32>,
    pub metadata_json: serde_json::Value,
}

/// Namespace used to derive the deterministic per-record UUID. Any fixed
/// UUID works as the namespace; what matters is that it never changes, so
/// `uuid5(NAMESPACE, class + ":" + profile_id)` is stable across restarts.
pub const UUID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x9e, 0x1f, 0x6c, 0x2a, 0x3b, 0x4d, 0x4e, 0x9a, 0x8f, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f, 0x60, 0x71,
]);

/// `uuid5(class + ":" + profile_id)`, deterministic and idempotent.
pub fn embedding_uuid(class: EntityClass, profile_id: &str) -> Uuid {
    let key = format!("{}:{}", class.as_str(), profile_id);
    Uuid::new_v5(&UUID_NAMESPACE, key.as_bytes())
}
