//! Structural error taxonomy for the orchestrator.
//!
//! Only malformed requests and infrastructure faults are errors. A failing
//! agent is data: it is recorded as that agent's `error` status and reported
//! inside the `RunResult`.

use claimflow_state::StorageError;

/// Orchestrator errors returned to the caller of `get_state` / `run`.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Invalid registry definition: cycle, duplicate id, or unknown dependency.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("agent not found: {0}")]
    NotFound(String),

    /// A requested agent depends on one that is neither complete nor part of the run.
    #[error("agent {agent} cannot run: dependency {missing} is not complete and not included in the run")]
    Dependency { agent: String, missing: String },

    #[error("a run is already in progress for claim {claim_id}")]
    ConcurrentRun { claim_id: String },

    #[error("request is for claim {requested} but the snapshot is claim {snapshot}")]
    ClaimMismatch { requested: String, snapshot: String },

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_names_both_agents() {
        let err = OrchestratorError::Dependency {
            agent: "fintrack".to_string(),
            missing: "core_agent".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fintrack"));
        assert!(msg.contains("core_agent"));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: OrchestratorError = StorageError::Backend("disk full".to_string()).into();
        assert!(matches!(err, OrchestratorError::Storage(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
