//! Tenant-scoped relational store for teams, interviewers and positions
//! backed by an embedded SQLite database via
//! `rusqlite` so the crate has no external runtime dependency.
//!
//! Set- and map-valued fields are stored as JSON columns: a fixed, known
//! shape decoded into a typed Rust struct field on read, not the
//! "dynamic dict of arbitrary shape" the re-architecture notes warn
//! against.

use std::sync::Mutex;

use rusqlite::Connection;

use crate::error::{CoreError, CoreResult};
use crate::model::{Interviewer, Position, Team};

/// Tenant-scoped CRUD over `teams`, `interviewers`, `positions`.
/// Guarded by a single mutex: SQLite serializes writers regardless, and a
/// single connection keeps this store simple to reason about under the
/// crate's "relational first, vector best-effort" write ordering (§5).
pub struct RelationalStore {
    conn: Mutex<Connection>,
}

impl RelationalStore {
    /// Opens (or creates) the database at `path`; pass `:memory:` for an
    /// ephemeral store, the default used by every test and by `Config`.
    pub fn open(path: &str) -> CoreResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| CoreError::TransportError(format!("opening relational store: {e}")))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            );
            CREATE TABLE IF NOT EXISTS interviewers (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            );
            CREATE TABLE IF NOT EXISTS positions (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (tenant_id, id)
            );
            ",
        )
        .map_err(|e| CoreError::TransportError(format!("creating schema: {e}")))?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn upsert(&self, table: &str, id: &str, tenant_id: &str, json: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {table} (id, tenant_id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(tenant_id, id) DO UPDATE SET data = excluded.data"
            ),
            rusqlite::params![id, tenant_id, json],
        )
        .map_err(|e| CoreError::TransportError(format!("writing {table} row {id}: {e}")))?;
        Ok(())
    }

    fn fetch(&self, table: &str, id: &str, tenant_id: &str) -> CoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT data FROM {table} WHERE tenant_id = ?1 AND id = ?2"),
            rusqlite::params![tenant_id, id],
            |row| row.get::<_, String>(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(CoreError::TransportError(format!("reading {table} row {id}: {other}"))),
        })
    }

    fn fetch_all(&self, table: &str, tenant_id: &str) -> CoreResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!("SELECT data FROM {table} WHERE tenant_id = ?1"))
            .map_err(|e| CoreError::TransportError(format!("preparing {table} scan: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params![tenant_id], |row| row.get::<_, String>(0))
            .map_err(|e| CoreError::TransportError(format!("scanning {table}: {e}")))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::TransportError(format!("scanning {table}: {e}")))
    }

    fn delete(&self, table: &str, id: &str, tenant_id: &str) -> CoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let affected = conn
            .execute(
                &format!("DELETE FROM {table} WHERE tenant_id = ?1 AND id = ?2"),
                rusqlite::params![tenant_id, id],
            )
            .map_err(|e| CoreError::TransportError(format!("deleting {table} row {id}: {e}")))?;
        if affected == 0 {
            return Err(CoreError::NotFound(format!("{table}:{id}")));
        }
        Ok(())
    }

    // ---------- Team ----------

    pub fn upsert_team(&self, team: &Team) -> CoreResult<()> {
        let json = serde_json::to_string(team)
            .map_err(|e| CoreError::ValidationError(format!("serializing team: {e}")))?;
        self.upsert("teams", &team.id, &team.tenant_id, &json)
    }

    pub fn get_team(&self, id: &str, tenant_id: &str) -> CoreResult<Team> {
        let json = self
            .fetch("teams", id, tenant_id)?
            .ok_or_else(|| CoreError::NotFound(format!("team:{id}")))?;
        serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding team: {e}")))
    }

    pub fn get_all_teams(&self, tenant_id: &str) -> CoreResult<Vec<Team>> {
        self.fetch_all("teams", tenant_id)?
            .into_iter()
            .map(|json| serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding team: {e}"))))
            .collect()
    }

    pub fn delete_team(&self, id: &str, tenant_id: &str) -> CoreResult<()> {
        self.delete("teams", id, tenant_id)
    }

    // ---------- Interviewer ----------

    pub fn upsert_interviewer(&self, interviewer: &Interviewer) -> CoreResult<()> {
        let json = serde_json::to_string(interviewer)
            .map_err(|e| CoreError::ValidationError(format!("serializing interviewer: {e}")))?;
        self.upsert("interviewers", &interviewer.id, &interviewer.tenant_id, &json)
    }

    pub fn get_interviewer(&self, id: &str, tenant_id: &str) -> CoreResult<Interviewer> {
        let json = self
            .fetch("interviewers", id, tenant_id)?
            .ok_or_else(|| CoreError::NotFound(format!("interviewer:{id}")))?;
        serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding interviewer: {e}")))
    }

    pub fn get_all_interviewers(&self, tenant_id: &str) -> CoreResult<Vec<Interviewer>> {
        self.fetch_all("interviewers", tenant_id)?
            .into_iter()
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding interviewer: {e}")))
            })
            .collect()
    }

    pub fn delete_interviewer(&self, id: &str, tenant_id: &str) -> CoreResult<()> {
        self.delete("interviewers", id, tenant_id)
    }

    // ---------- Position ----------

    pub fn upsert_position(&self, position: &Position) -> CoreResult<()> {
        let json = serde_json::to_string(position)
            .map_err(|e| CoreError::ValidationError(format!("serializing position: {e}")))?;
        self.upsert("positions", &position.id, &position.tenant_id, &json)
    }

    pub fn get_position(&self, id: &str, tenant_id: &str) -> CoreResult<Position> {
        let json = self
            .fetch("positions", id, tenant_id)?
            .ok_or_else(|| CoreError::NotFound(format!("position:{id}")))?;
        serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding position: {e}")))
    }

    pub fn get_all_positions(&self, tenant_id: &str) -> CoreResult<Vec<Position>> {
        self.fetch_all("positions", tenant_id)?
            .into_iter()
            .map(|json| serde_json::from_str(&json).map_err(|e| CoreError::ValidationError(format!("decoding position: {e}"))))
            .collect()
    }

    pub fn delete_position(&self, id: &str, tenant_id: &str) -> CoreResult<()> {
        self.delete("positions", id, tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_round_trips() {
        let store = RelationalStore::open(":memory:").unwrap();
        let team = Team::new("team1", "tenant1", "Platform");
        store.upsert_team(&team).unwrap();
        let fetched = store.get_team("team1", "tenant1").unwrap();
        assert_eq!(fetched.name, "Platform");
    }

    #[test]
    fn tenant_scoping_hides_other_tenants_rows() {
        let store = RelationalStore::open(":memory:").unwrap();
        store.upsert_team(&Team::new("team1", "tenant1", "Platform")).unwrap();
        assert!(store.get_team("team1", "tenant2").is_err());
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let store = RelationalStore::open(":memory:").unwrap();
        let mut team = Team::new("team1", "tenant1", "Platform");
        store.upsert_team(&team).unwrap();
        team.name = "Platform Renamed".to_string();
        store.upsert_team(&team).unwrap();
        assert_eq!(store.get_team("team1", "tenant1").unwrap().name, "Platform Renamed");
    }

    #[test]
    fn delete_missing_row_is_not_found() {
        let store = RelationalStore::open(":memory:").unwrap();
        assert!(store.delete_team("missing", "tenant1").is_err());
    }
}
