//! Contract tests for StateStore.
//!
//! Every conforming implementation must pass these. Each contract runs
//! against the in-memory fake and against SurrealDB (`mem://`).

use std::sync::Arc;

use claimflow_state::storage_traits::*;
use claimflow_state::{MemoryStateStore, SurrealStateStore};

async fn stores() -> Vec<(&'static str, Arc<dyn StateStore>)> {
    let surreal = SurrealStateStore::in_memory()
        .await
        .expect("in-memory surreal store");
    vec![
        ("memory", Arc::new(MemoryStateStore::new()) as Arc<dyn StateStore>),
        ("surreal", Arc::new(surreal) as Arc<dyn StateStore>),
    ]
}

// ===========================================================================
// load
// ===========================================================================

#[tokio::test]
async fn load_unseen_claim_is_empty() {
    for (name, store) in stores().await {
        let loaded = store.load(&ClaimId::new("never-seen")).await.unwrap();
        assert!(loaded.is_empty(), "{name}: expected empty state");
    }
}

// ===========================================================================
// put
// ===========================================================================

#[tokio::test]
async fn put_complete_record_round_trips() {
    for (name, store) in stores().await {
        let claim = ClaimId::new("CLM-100");
        let digest = ContentDigest::from_bytes(b"claim-snapshot");
        let output = serde_json::json!({"kind": "opaque", "data": {"total": 2750}});

        store
            .put(
                &claim,
                "fintrack",
                AgentRunRecord::complete(output.clone(), Some(digest.clone())),
            )
            .await
            .unwrap();

        let loaded = store.load(&claim).await.unwrap();
        let record = &loaded["fintrack"];
        assert_eq!(record.status, AgentStatus::Complete, "{name}");
        assert_eq!(record.output.as_ref(), Some(&output), "{name}");
        assert_eq!(record.input_digest.as_ref(), Some(&digest), "{name}");
        assert!(record.error_message.is_none(), "{name}");
    }
}

#[tokio::test]
async fn put_replaces_previous_record_for_same_key() {
    for (name, store) in stores().await {
        let claim = ClaimId::new("CLM-101");
        store
            .put(&claim, "core_agent", AgentRunRecord::running(None))
            .await
            .unwrap();
        store
            .put(
                &claim,
                "core_agent",
                AgentRunRecord::failed("domain", "bad input", None),
            )
            .await
            .unwrap();

        let loaded = store.load(&claim).await.unwrap();
        assert_eq!(loaded.len(), 1, "{name}: one row per key");
        assert_eq!(loaded["core_agent"].status, AgentStatus::Error, "{name}");
        assert_eq!(
            loaded["core_agent"].error_message.as_deref(),
            Some("bad input"),
            "{name}"
        );
    }
}

#[tokio::test]
async fn put_is_scoped_to_claim() {
    for (name, store) in stores().await {
        store
            .put(&ClaimId::new("A"), "drafting", AgentRunRecord::idle())
            .await
            .unwrap();

        assert!(
            store.load(&ClaimId::new("B")).await.unwrap().is_empty(),
            "{name}: claim B must not see claim A's rows"
        );
    }
}

// ===========================================================================
// put_many
// ===========================================================================

#[tokio::test]
async fn put_many_writes_every_record() {
    for (name, store) in stores().await {
        let claim = ClaimId::new("CLM-102");
        store
            .put(
                &claim,
                "fintrack",
                AgentRunRecord::complete(serde_json::json!({}), None),
            )
            .await
            .unwrap();

        store
            .put_many(
                &claim,
                vec![
                    ("fintrack".to_string(), AgentRunRecord::idle()),
                    ("drafting".to_string(), AgentRunRecord::idle()),
                ],
            )
            .await
            .unwrap();

        let loaded = store.load(&claim).await.unwrap();
        assert_eq!(loaded.len(), 2, "{name}");
        assert!(
            loaded.values().all(|r| r.status == AgentStatus::Idle),
            "{name}"
        );
    }
}

#[tokio::test]
async fn put_many_empty_is_noop() {
    for (name, store) in stores().await {
        let claim = ClaimId::new("CLM-103");
        store.put_many(&claim, Vec::new()).await.unwrap();
        assert!(store.load(&claim).await.unwrap().is_empty(), "{name}");
    }
}

// ===========================================================================
// list_claims
// ===========================================================================

#[tokio::test]
async fn list_claims_is_sorted_and_distinct() {
    for (name, store) in stores().await {
        for claim in ["zeta", "alpha", "alpha"] {
            store
                .put(&ClaimId::new(claim), "core_agent", AgentRunRecord::idle())
                .await
                .unwrap();
            store
                .put(&ClaimId::new(claim), "fintrack", AgentRunRecord::idle())
                .await
                .unwrap();
        }

        let claims = store.list_claims().await.unwrap();
        assert_eq!(
            claims,
            vec![ClaimId::new("alpha"), ClaimId::new("zeta")],
            "{name}"
        );
    }
}
