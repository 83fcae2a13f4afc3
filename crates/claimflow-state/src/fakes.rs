//! In-memory state store
//!
//! `MemoryStateStore` satisfies the [`StateStore`] contract without any
//! external dependencies. Used by the test suites and by the CLI's
//! `--store memory` mode.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

type ClaimRecords = BTreeMap<String, AgentRunRecord>;

/// In-memory store backed by a `HashMap<ClaimId, BTreeMap<agent, record>>`.
///
/// A single mutex guards the map, so every write is observed whole.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    claims: Mutex<HashMap<ClaimId, ClaimRecords>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<ClaimId, ClaimRecords>>> {
        self.claims
            .lock()
            .map_err(|e| StorageError::Backend(format!("state store lock poisoned: {e}")))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, claim_id: &ClaimId) -> StorageResult<ClaimRecords> {
        let claims = self.lock()?;
        Ok(claims.get(claim_id).cloned().unwrap_or_default())
    }

    async fn put(
        &self,
        claim_id: &ClaimId,
        agent_id: &str,
        record: AgentRunRecord,
    ) -> StorageResult<()> {
        let mut claims = self.lock()?;
        claims
            .entry(claim_id.clone())
            .or_default()
            .insert(agent_id.to_string(), record);
        Ok(())
    }

    async fn put_many(
        &self,
        claim_id: &ClaimId,
        records: Vec<(String, AgentRunRecord)>,
    ) -> StorageResult<()> {
        let mut claims = self.lock()?;
        let entry = claims.entry(claim_id.clone()).or_default();
        for (agent_id, record) in records {
            entry.insert(agent_id, record);
        }
        Ok(())
    }

    async fn list_claims(&self) -> StorageResult<Vec<ClaimId>> {
        let claims = self.lock()?;
        let mut ids: Vec<ClaimId> = claims.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_load() {
        let store = MemoryStateStore::new();
        let claim = ClaimId::new("CLM-1");
        store
            .put(&claim, "core_agent", AgentRunRecord::running(None))
            .await
            .unwrap();

        let loaded = store.load(&claim).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["core_agent"].status, AgentStatus::Running);
    }

    #[tokio::test]
    async fn test_claims_are_isolated() {
        let store = MemoryStateStore::new();
        store
            .put(&ClaimId::new("a"), "fintrack", AgentRunRecord::idle())
            .await
            .unwrap();

        assert!(store.load(&ClaimId::new("b")).await.unwrap().is_empty());
        assert_eq!(store.list_claims().await.unwrap(), vec![ClaimId::new("a")]);
    }
}
