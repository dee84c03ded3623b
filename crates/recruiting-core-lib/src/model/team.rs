use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub domain: String,
    pub needs: BTreeSet<String>,
    pub expertise: BTreeSet<String>,
    pub member_ids: BTreeSet<String>,
    pub open_positions: BTreeSet<String>,
}

impl Team {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            domain: String::new(),
            needs: BTreeSet::new(),
            expertise: BTreeSet::new(),
            member_ids: BTreeSet::new(),
            open_positions: BTreeSet::new(),
        }
    }

    /// `member_count` is a derived invariant, not a stored field, so it can
    /// never drift from `member_ids.len()`.
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn embedding_text(&self) -> String {
        format!(
            "name:{} domain:{} needs:{} expertise:{}",
            self.name,
            self.domain,
            self.needs.iter().cloned().collect::<Vec<_>>().join(","),
            self.expertise.iter().cloned().collect::<Vec<_>>().join(","),
        )
    }
}
