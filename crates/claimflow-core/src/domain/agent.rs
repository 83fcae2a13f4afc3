//! Agent identity and static definition.

use serde::{Deserialize, Serialize};

use super::error::{OrchestratorError, Result};

/// Document extraction; structures the raw claim.
pub const CORE_AGENT: &str = "core_agent";
/// Damage and payout estimation.
pub const FINTRACK: &str = "fintrack";
/// Repair shop lookup.
pub const REPAIR_ADVISOR: &str = "repair_advisor";
/// Claim document drafting.
pub const DRAFTING: &str = "drafting";
/// Compliance and submission validation.
pub const COMPLIANCE: &str = "compliance";

/// Unique agent key, e.g. `core_agent`.
///
/// Restricted to lowercase ASCII letters, digits and `_` so ids are safe to
/// embed in storage keys and log fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(OrchestratorError::InvalidId(format!(
                "agent id {id:?} must be non-empty [a-z0-9_]"
            )));
        }
        Ok(AgentId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AgentId {
    type Error = OrchestratorError;

    fn try_from(s: String) -> Result<Self> {
        AgentId::new(s)
    }
}

impl From<AgentId> for String {
    fn from(id: AgentId) -> Self {
        id.0
    }
}

impl std::str::FromStr for AgentId {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        AgentId::new(s)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl PartialEq<str> for AgentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for AgentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Immutable definition of one agent. Specs are static definitions; they do
/// not execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    /// Agents that must be `complete` before this one may run.
    pub dependencies: Vec<AgentId>,
}

impl AgentSpec {
    pub fn new(
        id: &str,
        name: impl Into<String>,
        description: impl Into<String>,
        dependencies: &[&str],
    ) -> Result<Self> {
        let dependencies = dependencies
            .iter()
            .map(|d| AgentId::new(*d))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: AgentId::new(id)?,
            name: name.into(),
            description: description.into(),
            dependencies,
        })
    }

    pub fn depends_on(&self, other: &AgentId) -> bool {
        self.dependencies.contains(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_validation() {
        assert!(AgentId::new("core_agent").is_ok());
        assert!(AgentId::new("agent2").is_ok());
        assert!(AgentId::new("").is_err());
        assert!(AgentId::new("Core Agent").is_err());
        assert!(AgentId::new("fin-track").is_err());
    }

    #[test]
    fn test_agent_id_deserialize_validates() {
        let ok: AgentId = serde_json::from_str("\"fintrack\"").unwrap();
        assert_eq!(ok, "fintrack");
        assert!(serde_json::from_str::<AgentId>("\"FinTrack\"").is_err());
    }

    #[test]
    fn test_spec_new_collects_dependencies() {
        let spec = AgentSpec::new(DRAFTING, "Drafting", "drafts", &[CORE_AGENT, FINTRACK]).unwrap();
        assert_eq!(spec.dependencies.len(), 2);
        assert!(spec.depends_on(&AgentId::new(FINTRACK).unwrap()));
        assert!(!spec.depends_on(&AgentId::new(COMPLIANCE).unwrap()));
    }
}
