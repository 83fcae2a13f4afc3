//! Storage trait definitions for claimflow
//!
//! The orchestrator persists one [`AgentRunRecord`] per `(claim, agent)` pair.
//! [`StateStore`] is async and backend-agnostic; an in-memory implementation
//! lives in [`crate::fakes`] and a SurrealDB one in [`crate::surreal_store`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Claim identity and agent lifecycle
// ---------------------------------------------------------------------------

/// Identifier of the claim that owns a set of agent run records
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub String);

impl ClaimId {
    pub fn new(id: impl Into<String>) -> Self {
        ClaimId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClaimId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of one agent for one claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Running => "running",
            AgentStatus::Complete => "complete",
            AgentStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentStatus::Idle),
            "running" => Ok(AgentStatus::Running),
            "complete" => Ok(AgentStatus::Complete),
            "error" => Ok(AgentStatus::Error),
            other => Err(StorageError::Serialization(format!(
                "unknown agent status: {other}"
            ))),
        }
    }
}

/// Persisted state of one agent for one claim.
///
/// Constructed only through the status-specific constructors so that
/// `output` is present iff `Complete` and the error fields iff `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunRecord {
    pub status: AgentStatus,
    pub output: Option<serde_json::Value>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    /// Digest of the claim snapshot the agent last ran against
    pub input_digest: Option<ContentDigest>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRunRecord {
    pub fn idle() -> Self {
        Self {
            status: AgentStatus::Idle,
            output: None,
            error_kind: None,
            error_message: None,
            input_digest: None,
            updated_at: Utc::now(),
        }
    }

    pub fn running(input_digest: Option<ContentDigest>) -> Self {
        Self {
            status: AgentStatus::Running,
            input_digest,
            ..Self::idle()
        }
    }

    pub fn complete(output: serde_json::Value, input_digest: Option<ContentDigest>) -> Self {
        Self {
            status: AgentStatus::Complete,
            output: Some(output),
            input_digest,
            ..Self::idle()
        }
    }

    pub fn failed(
        kind: impl Into<String>,
        message: impl Into<String>,
        input_digest: Option<ContentDigest>,
    ) -> Self {
        Self {
            status: AgentStatus::Error,
            error_kind: Some(kind.into()),
            error_message: Some(message.into()),
            input_digest,
            ..Self::idle()
        }
    }
}

impl Default for AgentRunRecord {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Per-claim orchestrator state persistence.
///
/// Guarantees:
/// - `load` on an unseen claim returns an empty map, never an error.
/// - `put` replaces the record for one `(claim, agent)` key atomically; a
///   concurrent `load` observes either the old or the new record.
/// - `put_many` applies all of its records or none of them.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load every stored record for a claim, keyed by agent id.
    async fn load(&self, claim_id: &ClaimId) -> StorageResult<BTreeMap<String, AgentRunRecord>>;

    /// Replace the record for one agent of one claim.
    async fn put(
        &self,
        claim_id: &ClaimId,
        agent_id: &str,
        record: AgentRunRecord,
    ) -> StorageResult<()>;

    /// Replace several records of one claim in a single atomic step.
    async fn put_many(
        &self,
        claim_id: &ClaimId,
        records: Vec<(String, AgentRunRecord)>,
    ) -> StorageResult<()>;

    /// List every claim that has at least one stored record.
    async fn list_claims(&self) -> StorageResult<Vec<ClaimId>>;
}
