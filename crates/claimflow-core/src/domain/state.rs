//! Typed per-claim orchestrator state.
//!
//! The store persists loosely-typed [`AgentRunRecord`] rows; this module
//! lifts them into [`AgentRunState`] and assembles the registry-ordered
//! [`OrchestratorState`] handed to callers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use claimflow_state::{AgentRunRecord, AgentStatus, ClaimId, ContentDigest};
use serde::{Deserialize, Serialize};

use super::agent::AgentId;
use super::claim::Claim;
use super::error::Result;
use super::output::{AgentFailure, AgentOutput, FailureKind};

/// Current state of one agent for one claim.
///
/// `output` is present iff `status == Complete`; `error` iff `status == Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRunState {
    pub status: AgentStatus,
    pub output: Option<AgentOutput>,
    pub error: Option<AgentFailure>,
    /// Digest of the claim snapshot this agent last ran against.
    pub input_digest: Option<ContentDigest>,
    pub updated_at: DateTime<Utc>,
}

impl AgentRunState {
    pub fn idle() -> Self {
        Self {
            status: AgentStatus::Idle,
            output: None,
            error: None,
            input_digest: None,
            updated_at: Utc::now(),
        }
    }

    pub fn running(input_digest: ContentDigest) -> Self {
        Self {
            status: AgentStatus::Running,
            input_digest: Some(input_digest),
            ..Self::idle()
        }
    }

    pub fn complete(output: AgentOutput, input_digest: ContentDigest) -> Self {
        Self {
            status: AgentStatus::Complete,
            output: Some(output),
            input_digest: Some(input_digest),
            ..Self::idle()
        }
    }

    pub fn failed(failure: AgentFailure, input_digest: ContentDigest) -> Self {
        Self {
            status: AgentStatus::Error,
            error: Some(failure),
            input_digest: Some(input_digest),
            ..Self::idle()
        }
    }

    /// Lift a stored row into typed state.
    ///
    /// A `complete` row whose output no longer decodes is reported as an
    /// `invalid_output` failure so that callers never see a complete agent
    /// without an output.
    pub fn from_record(record: AgentRunRecord) -> Self {
        let AgentRunRecord {
            status,
            output,
            error_kind,
            error_message,
            input_digest,
            updated_at,
        } = record;

        match status {
            AgentStatus::Complete => {
                let decoded = output
                    .ok_or_else(|| "complete record has no output".to_string())
                    .and_then(|v| {
                        serde_json::from_value::<AgentOutput>(v).map_err(|e| e.to_string())
                    });
                match decoded {
                    Ok(output) => Self {
                        status,
                        output: Some(output),
                        error: None,
                        input_digest,
                        updated_at,
                    },
                    Err(reason) => Self {
                        status: AgentStatus::Error,
                        output: None,
                        error: Some(AgentFailure::new(
                            FailureKind::InvalidOutput,
                            format!("stored output unreadable: {reason}"),
                        )),
                        input_digest,
                        updated_at,
                    },
                }
            }
            AgentStatus::Error => {
                let kind = error_kind
                    .as_deref()
                    .map(FailureKind::parse_lenient)
                    .unwrap_or(FailureKind::Domain);
                let message = error_message.unwrap_or_else(|| "unknown error".to_string());
                Self {
                    status,
                    output: None,
                    error: Some(AgentFailure::new(kind, message)),
                    input_digest,
                    updated_at,
                }
            }
            AgentStatus::Idle | AgentStatus::Running => Self {
                status,
                output: None,
                error: None,
                input_digest,
                updated_at,
            },
        }
    }

    pub fn to_record(&self) -> Result<AgentRunRecord> {
        let output = self.output.as_ref().map(serde_json::to_value).transpose()?;
        Ok(AgentRunRecord {
            status: self.status,
            output,
            error_kind: self.error.as_ref().map(|e| e.kind.as_str().to_string()),
            error_message: self.error.as_ref().map(|e| e.message.clone()),
            input_digest: self.input_digest.clone(),
            updated_at: self.updated_at,
        })
    }
}

impl Default for AgentRunState {
    fn default() -> Self {
        Self::idle()
    }
}

/// One agent's row in an [`OrchestratorState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStateEntry {
    pub agent_id: AgentId,
    #[serde(flatten)]
    pub state: AgentRunState,
}

/// Full per-claim mapping of agent id to run state.
///
/// Entries follow registry order and cover exactly the registered agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorState {
    pub claim_id: ClaimId,
    pub agents: Vec<AgentStateEntry>,
}

impl OrchestratorState {
    /// Assemble state for `ids` from stored rows. Missing rows are `idle`;
    /// rows for ids outside `ids` are dropped.
    pub fn from_records<'a>(
        claim_id: ClaimId,
        ids: impl IntoIterator<Item = &'a AgentId>,
        mut records: BTreeMap<String, AgentRunRecord>,
    ) -> Self {
        let agents: Vec<AgentStateEntry> = ids
            .into_iter()
            .map(|id| AgentStateEntry {
                agent_id: id.clone(),
                state: records
                    .remove(id.as_str())
                    .map(AgentRunState::from_record)
                    .unwrap_or_default(),
            })
            .collect();

        for unknown in records.keys() {
            tracing::warn!(
                claim_id = %claim_id,
                agent_id = %unknown,
                "ignoring state for unregistered agent"
            );
        }

        Self { claim_id, agents }
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentRunState> {
        self.agents
            .iter()
            .find(|e| e.agent_id == agent_id)
            .map(|e| &e.state)
    }

    /// Status of `agent_id`; unknown ids read as `idle`.
    pub fn status(&self, agent_id: &str) -> AgentStatus {
        self.get(agent_id).map(|s| s.status).unwrap_or_default()
    }

    pub fn output(&self, agent_id: &str) -> Option<&AgentOutput> {
        self.get(agent_id).and_then(|s| s.output.as_ref())
    }

    pub(crate) fn set(&mut self, agent_id: &AgentId, state: AgentRunState) {
        if let Some(entry) = self.agents.iter_mut().find(|e| &e.agent_id == agent_id) {
            entry.state = state;
        }
    }

    pub fn all_complete(&self) -> bool {
        self.agents
            .iter()
            .all(|e| e.state.status == AgentStatus::Complete)
    }

    /// Complete agents whose output was computed from a different claim
    /// snapshot than `claim`.
    pub fn stale_agents(&self, claim: &Claim) -> Result<Vec<AgentId>> {
        let current = claim.digest()?;
        Ok(self
            .agents
            .iter()
            .filter(|e| e.state.status == AgentStatus::Complete)
            .filter(|e| e.state.input_digest.as_ref() != Some(&current))
            .map(|e| e.agent_id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claim::fixtures::sample_claim;

    fn ids(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_missing_rows_are_idle_and_unknown_rows_dropped() {
        let mut records = BTreeMap::new();
        records.insert(
            "retired_agent".to_string(),
            AgentRunRecord::complete(serde_json::json!({"kind": "opaque", "data": 1}), None),
        );
        let state = OrchestratorState::from_records(
            ClaimId::new("c1"),
            &ids(&["core_agent", "fintrack"]),
            records,
        );

        assert_eq!(state.agents.len(), 2);
        assert_eq!(state.agents[0].agent_id, "core_agent");
        assert!(state.agents.iter().all(|e| e.state.status == AgentStatus::Idle));
        assert!(state.get("retired_agent").is_none());
    }

    #[test]
    fn test_undecodable_output_surfaces_as_invalid_output() {
        let record = AgentRunRecord::complete(serde_json::json!({"kind": "mystery"}), None);
        let state = AgentRunState::from_record(record);

        assert_eq!(state.status, AgentStatus::Error);
        assert!(state.output.is_none());
        assert_eq!(state.error.unwrap().kind, FailureKind::InvalidOutput);
    }

    #[test]
    fn test_record_round_trip_keeps_failure() {
        let digest = ContentDigest::from_bytes(b"claim");
        let state = AgentRunState::failed(
            AgentFailure::new(FailureKind::Timeout, "took too long"),
            digest.clone(),
        );
        let back = AgentRunState::from_record(state.to_record().unwrap());

        assert_eq!(back.status, AgentStatus::Error);
        assert_eq!(back.error.as_ref().unwrap().kind, FailureKind::Timeout);
        assert_eq!(back.input_digest, Some(digest));
    }

    #[test]
    fn test_stale_agents_compares_claim_digest() {
        let claim = sample_claim();
        let current = claim.digest().unwrap();
        let old = ContentDigest::from_bytes(b"older snapshot");
        let output = AgentOutput::Opaque(serde_json::json!({}));

        let mut state =
            OrchestratorState::from_records(claim.id(), &ids(&["a", "b", "c"]), BTreeMap::new());
        state.set(&ids(&["a"])[0], AgentRunState::complete(output.clone(), current));
        state.set(&ids(&["b"])[0], AgentRunState::complete(output, old));

        assert_eq!(state.stale_agents(&claim).unwrap(), ids(&["b"]));
    }
}
