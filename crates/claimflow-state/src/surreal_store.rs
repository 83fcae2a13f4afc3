//! SurrealDB-backed StateStore implementation
//!
//! Rows live in the `agent_states` table under the deterministic record id
//! `agent_states:⟨claim_id/agent_id⟩` and are converted to and from
//! [`AgentRunRecord`] at the boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::storage_traits::{
    AgentRunRecord, AgentStatus, ClaimId, ContentDigest, StateStore, StorageResult,
};

const NAMESPACE: &str = "claimflow";
const DATABASE: &str = "main";
const LOCAL_DB_PATH: &str = ".claimflow/db";

/// Database row for one `(claim, agent)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentStateRow {
    claim_id: String,
    agent_id: String,
    status: String,
    output: Option<serde_json::Value>,
    error_kind: Option<String>,
    error_message: Option<String>,
    input_digest: Option<String>,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct ClaimRow {
    claim_id: String,
}

/// SurrealDB-backed implementation of [`StateStore`].
pub struct SurrealStateStore {
    db: Surreal<Any>,
}

impl SurrealStateStore {
    /// Create an in-memory instance (`mem://`).
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint understood by `engine::any`
    /// (`mem://`, `surrealkv://path`, `ws://host:port`, ...).
    #[instrument(skip_all, fields(endpoint = %endpoint))]
    pub async fn connect(endpoint: &str) -> crate::Result<Self> {
        let db = surrealdb::engine::any::connect(endpoint)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {endpoint}: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealStateStore connected");
        Ok(Self { db })
    }

    /// Create from environment variables.
    ///
    /// Uses `SURREALDB_URL` when set, otherwise local persistence under
    /// `.claimflow/db` in the working directory.
    pub async fn from_env() -> crate::Result<Self> {
        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return Self::connect(&url).await;
        }
        Self::local(LOCAL_DB_PATH).await
    }

    /// Open (or create) an on-disk SurrealKV database at `path`.
    pub async fn local(path: &str) -> crate::Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            StateError::Connection(format!(
                "Failed to create database directory {}: {}",
                path, e
            ))
        })?;
        let url = format!("surrealkv://{}", path);
        info!("Using local persistence: {}", url);
        Self::connect(&url).await
    }

    // -- private helpers -----------------------------------------------------

    fn record_key(claim_id: &ClaimId, agent_id: &str) -> String {
        format!("{}/{}", claim_id.0, agent_id)
    }

    fn record_to_row(claim_id: &ClaimId, agent_id: &str, record: AgentRunRecord) -> AgentStateRow {
        AgentStateRow {
            claim_id: claim_id.0.clone(),
            agent_id: agent_id.to_string(),
            status: record.status.as_str().to_string(),
            output: record.output,
            error_kind: record.error_kind,
            error_message: record.error_message,
            input_digest: record.input_digest.map(String::from),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    fn row_to_record(row: AgentStateRow) -> StorageResult<(String, AgentRunRecord)> {
        let status: AgentStatus = row.status.parse()?;
        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map_err(|e| StorageError::Serialization(format!("bad updated_at: {e}")))?
            .with_timezone(&Utc);
        let input_digest = row.input_digest.map(ContentDigest::try_from).transpose()?;

        Ok((
            row.agent_id,
            AgentRunRecord {
                status,
                output: row.output,
                error_kind: row.error_kind,
                error_message: row.error_message,
                input_digest,
                updated_at,
            },
        ))
    }
}

#[async_trait]
impl StateStore for SurrealStateStore {
    async fn load(&self, claim_id: &ClaimId) -> StorageResult<BTreeMap<String, AgentRunRecord>> {
        let cid = claim_id.0.clone();
        let mut res = self
            .db
            .query(
                "SELECT claim_id, agent_id, status, output, error_kind, error_message, \
                 input_digest, updated_at FROM agent_states WHERE claim_id = $cid",
            )
            .bind(("cid", cid))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<AgentStateRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn put(
        &self,
        claim_id: &ClaimId,
        agent_id: &str,
        record: AgentRunRecord,
    ) -> StorageResult<()> {
        let key = Self::record_key(claim_id, agent_id);
        let row = Self::record_to_row(claim_id, agent_id, record);

        debug!(claim_id = %claim_id, agent_id, status = %row.status, "upserting agent state");

        self.db
            .query("UPSERT type::thing('agent_states', $key) CONTENT $row")
            .bind(("key", key))
            .bind(("row", row))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn put_many(
        &self,
        claim_id: &ClaimId,
        records: Vec<(String, AgentRunRecord)>,
    ) -> StorageResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for i in 0..records.len() {
            sql.push_str(&format!(
                "UPSERT type::thing('agent_states', $key{i}) CONTENT $row{i};\n"
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.db.query(sql);
        for (i, (agent_id, record)) in records.into_iter().enumerate() {
            let key = Self::record_key(claim_id, &agent_id);
            let row = Self::record_to_row(claim_id, &agent_id, record);
            query = query.bind((format!("key{i}"), key)).bind((format!("row{i}"), row));
        }

        query
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .check()
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn list_claims(&self) -> StorageResult<Vec<ClaimId>> {
        let mut res = self
            .db
            .query("SELECT claim_id FROM agent_states GROUP BY claim_id")
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<ClaimRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut ids: Vec<ClaimId> = rows.into_iter().map(|r| ClaimId(r.claim_id)).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion_preserves_fields() {
        let claim = ClaimId::new("CLM-7");
        let digest = ContentDigest::from_bytes(b"snapshot");
        let record = AgentRunRecord::failed("timeout", "took too long", Some(digest.clone()));

        let row = SurrealStateStore::record_to_row(&claim, "fintrack", record.clone());
        assert_eq!(row.status, "error");
        assert_eq!(row.input_digest.as_deref(), Some(digest.as_str()));

        let (agent_id, back) = SurrealStateStore::row_to_record(row).unwrap();
        assert_eq!(agent_id, "fintrack");
        assert_eq!(back.status, AgentStatus::Error);
        assert_eq!(back.error_kind.as_deref(), Some("timeout"));
        assert_eq!(back.input_digest, Some(digest));
        assert_eq!(back.updated_at.timestamp(), record.updated_at.timestamp());
    }

    #[test]
    fn test_row_with_unknown_status_is_rejected() {
        let row = AgentStateRow {
            claim_id: "c".to_string(),
            agent_id: "a".to_string(),
            status: "paused".to_string(),
            output: None,
            error_kind: None,
            error_message: None,
            input_digest: None,
            updated_at: Utc::now().to_rfc3339(),
        };
        assert!(SurrealStateStore::row_to_record(row).is_err());
    }
}
