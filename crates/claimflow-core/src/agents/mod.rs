//! Built-in claim analysis agents.
//!
//! Each agent is a pure function of the claim snapshot and the outputs of
//! its declared dependencies:
//!
//! - `core_agent`: structures the raw claim into extracted data
//! - `fintrack`: damage and payout estimate
//! - `repair_advisor`: nearby certified repair shops
//! - `drafting`: claim document, with the estimate when available
//! - `compliance`: submission checks and a PII scan of the draft

pub mod compliance;
pub mod core_agent;
pub mod drafting;
pub mod fintrack;
pub mod repair_advisor;

use crate::domain::agent::{COMPLIANCE, CORE_AGENT, DRAFTING, FINTRACK, REPAIR_ADVISOR};
use crate::domain::{AgentSpec, OrchestratorError, Result};
use crate::registry::AgentRegistry;

pub use compliance::ComplianceAgent;
pub use core_agent::CoreAgent;
pub use drafting::DraftingAgent;
pub use fintrack::FinTrackAgent;
pub use repair_advisor::RepairAdvisorAgent;

/// Specs of the five built-in agents, in registration order.
pub fn builtin_specs() -> Result<Vec<AgentSpec>> {
    Ok(vec![
        AgentSpec::new(
            CORE_AGENT,
            "ClaimPilot Core",
            "Analyzes and extracts key information from uploaded documents and \
             structures the raw claim data for the other agents.",
            &[],
        )?,
        AgentSpec::new(
            FINTRACK,
            "FinTrack",
            "Estimates repair costs and the expected payout from damage severity \
             and the policy deductible.",
            &[CORE_AGENT],
        )?,
        AgentSpec::new(
            REPAIR_ADVISOR,
            "Repair Advisor",
            "Finds nearby certified repair shops with the best ratings and prices.",
            &[CORE_AGENT],
        )?,
        AgentSpec::new(
            DRAFTING,
            "Claim Drafting Agent",
            "Creates a claim document ready to submit to the insurance company, \
             including the calculated estimate.",
            &[CORE_AGENT, FINTRACK],
        )?,
        AgentSpec::new(
            COMPLIANCE,
            "Compliance Agent",
            "Validates the claim for completeness and checks the draft for \
             personal data before submission.",
            &[CORE_AGENT, DRAFTING],
        )?,
    ])
}

/// Registry with the five built-in agents wired to their handlers.
pub fn builtin_registry() -> Result<AgentRegistry> {
    let compliance = ComplianceAgent::new()
        .map_err(|e| OrchestratorError::Configuration(format!("compliance patterns: {e}")))?;

    let mut specs = builtin_specs()?.into_iter();
    let mut next = || {
        specs
            .next()
            .ok_or_else(|| OrchestratorError::Configuration("missing built-in spec".to_string()))
    };

    AgentRegistry::builder()
        .register(next()?, CoreAgent)
        .register(next()?, FinTrackAgent)
        .register(next()?, RepairAdvisorAgent)
        .register(next()?, DraftingAgent)
        .register(next()?, compliance)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_graph() {
        let registry = builtin_registry().unwrap();
        let ids: Vec<&str> = registry.ids().map(|id| id.as_str()).collect();
        assert_eq!(
            ids,
            [CORE_AGENT, FINTRACK, REPAIR_ADVISOR, DRAFTING, COMPLIANCE]
        );

        let drafting = registry.get_agent(DRAFTING).unwrap();
        assert_eq!(drafting.name, "Claim Drafting Agent");
        assert_eq!(drafting.dependencies, [CORE_AGENT, FINTRACK]);
        assert!(registry.get_agent(CORE_AGENT).unwrap().dependencies.is_empty());
    }
}
