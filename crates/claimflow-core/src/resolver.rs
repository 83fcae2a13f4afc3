//! Dependency gating and deterministic run ordering.

use std::collections::BTreeSet;

use claimflow_state::AgentStatus;

use crate::domain::{AgentId, OrchestratorError, OrchestratorState, Result};
use crate::registry::AgentRegistry;

/// Answers "may this agent run now?" and "in what order should these run?"
/// against one registry.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    /// True iff every declared dependency of `agent_id` is `complete`.
    pub fn can_run(&self, agent_id: &str, state: &OrchestratorState) -> Result<bool> {
        Ok(self.first_blocker(agent_id, state)?.is_none())
    }

    /// The first declared dependency (in declaration order) that is not
    /// `complete`, if any.
    pub fn first_blocker(
        &self,
        agent_id: &str,
        state: &OrchestratorState,
    ) -> Result<Option<&'a AgentId>> {
        let spec = self.registry.get_agent(agent_id)?;
        Ok(spec
            .dependencies
            .iter()
            .find(|dep| state.status(dep.as_str()) != AgentStatus::Complete))
    }

    /// Order `requested` so every agent comes after its dependencies.
    ///
    /// Kahn's algorithm over the requested set; among ready agents the one
    /// registered first goes next, so identical inputs always give identical
    /// orders. Every dependency of a requested agent must be either
    /// `complete` already or requested itself, otherwise nothing is ordered
    /// and a `Dependency` error names the first missing prerequisite.
    pub fn topological_run_order(
        &self,
        requested: &[AgentId],
        state: &OrchestratorState,
    ) -> Result<Vec<AgentId>> {
        let mut members = BTreeSet::new();
        for id in requested {
            let pos = self
                .registry
                .position(id.as_str())
                .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;
            members.insert(pos);
        }

        let specs = self.registry.list_agents();
        for &pos in &members {
            let spec = specs[pos];
            for dep in &spec.dependencies {
                let dep_requested = self
                    .registry
                    .position(dep.as_str())
                    .is_some_and(|p| members.contains(&p));
                if !dep_requested && state.status(dep.as_str()) != AgentStatus::Complete {
                    return Err(OrchestratorError::Dependency {
                        agent: spec.id.to_string(),
                        missing: dep.to_string(),
                    });
                }
            }
        }

        // In-degree counts only edges inside the requested set.
        let mut indegree: Vec<usize> = vec![0; specs.len()];
        for &pos in &members {
            indegree[pos] = specs[pos]
                .dependencies
                .iter()
                .filter_map(|d| self.registry.position(d.as_str()))
                .filter(|p| members.contains(p))
                .count();
        }

        let mut ready: BTreeSet<usize> = members
            .iter()
            .copied()
            .filter(|&p| indegree[p] == 0)
            .collect();
        let mut order = Vec::with_capacity(members.len());

        while let Some(next) = ready.pop_first() {
            order.push(specs[next].id.clone());
            for &pos in &members {
                if specs[pos].depends_on(&specs[next].id) {
                    indegree[pos] -= 1;
                    if indegree[pos] == 0 {
                        ready.insert(pos);
                    }
                }
            }
        }

        if order.len() != members.len() {
            return Err(OrchestratorError::Configuration(
                "dependency cycle among requested agents".to_string(),
            ));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use claimflow_state::ClaimId;

    use super::*;
    use crate::domain::{AgentOutput, AgentRunState, AgentSpec};
    use crate::executor::{handler_fn, AgentHandler};

    fn noop() -> impl AgentHandler {
        handler_fn(|_ctx| async { Ok(AgentOutput::Opaque(serde_json::Value::Null)) })
    }

    fn registry() -> AgentRegistry {
        let spec = |id: &str, deps: &[&str]| AgentSpec::new(id, id, "", deps).unwrap();
        AgentRegistry::builder()
            .register(spec("core_agent", &[]), noop())
            .register(spec("fintrack", &["core_agent"]), noop())
            .register(spec("repair_advisor", &["core_agent"]), noop())
            .register(spec("drafting", &["core_agent", "fintrack"]), noop())
            .register(spec("compliance", &["core_agent", "drafting"]), noop())
            .build()
            .unwrap()
    }

    fn fresh(registry: &AgentRegistry) -> OrchestratorState {
        OrchestratorState::from_records(ClaimId::new("c1"), registry.ids(), BTreeMap::new())
    }

    fn id(s: &str) -> AgentId {
        AgentId::new(s).unwrap()
    }

    fn complete(state: &mut OrchestratorState, agent: &str) {
        state.set(
            &id(agent),
            AgentRunState::complete(
                AgentOutput::Opaque(serde_json::Value::Null),
                claimflow_state::ContentDigest::from_bytes(b"c"),
            ),
        );
    }

    #[test]
    fn test_can_run_requires_complete_dependencies() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);
        let mut state = fresh(&registry);

        assert!(resolver.can_run("core_agent", &state).unwrap());
        assert!(!resolver.can_run("fintrack", &state).unwrap());

        complete(&mut state, "core_agent");
        assert!(resolver.can_run("fintrack", &state).unwrap());
        assert_eq!(
            resolver.first_blocker("drafting", &state).unwrap(),
            Some(&id("fintrack"))
        );
    }

    #[test]
    fn test_run_all_order_follows_registration_on_ties() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);
        let all: Vec<AgentId> = registry.ids().cloned().collect();

        let order = resolver.topological_run_order(&all, &fresh(&registry)).unwrap();
        let names: Vec<&str> = order.iter().map(|i| i.as_str()).collect();
        assert_eq!(
            names,
            ["core_agent", "fintrack", "repair_advisor", "drafting", "compliance"]
        );
    }

    #[test]
    fn test_request_order_does_not_matter() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);
        let state = fresh(&registry);

        let a = resolver
            .topological_run_order(&[id("drafting"), id("fintrack"), id("core_agent")], &state)
            .unwrap();
        let b = resolver
            .topological_run_order(&[id("core_agent"), id("drafting"), id("fintrack")], &state)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![id("core_agent"), id("fintrack"), id("drafting")]);
    }

    #[test]
    fn test_skipped_prerequisite_is_dependency_error() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);

        let err = resolver
            .topological_run_order(&[id("fintrack")], &fresh(&registry))
            .unwrap_err();
        match err {
            OrchestratorError::Dependency { agent, missing } => {
                assert_eq!(agent, "fintrack");
                assert_eq!(missing, "core_agent");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_complete_prerequisite_need_not_be_requested() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);
        let mut state = fresh(&registry);
        complete(&mut state, "core_agent");

        let order = resolver
            .topological_run_order(&[id("drafting"), id("fintrack")], &state)
            .unwrap();
        assert_eq!(order, vec![id("fintrack"), id("drafting")]);
    }

    #[test]
    fn test_unknown_agent_is_not_found() {
        let registry = registry();
        let resolver = DependencyResolver::new(&registry);
        let err = resolver
            .topological_run_order(&[id("underwriter")], &fresh(&registry))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NotFound(_)));
    }
}
