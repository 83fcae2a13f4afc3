//! Static, validated agent registry.
//!
//! The registry is built once at startup and is read-only afterwards, so it
//! needs no locking. Construction fails on duplicate ids, dependencies on
//! unregistered agents, and dependency cycles.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::domain::run::ALL_AGENTS;
use crate::domain::{AgentId, AgentSpec, OrchestratorError, Result};
use crate::executor::AgentHandler;

struct RegisteredAgent {
    spec: AgentSpec,
    handler: Arc<dyn AgentHandler>,
}

/// Ordered set of agent specs and the domain functions that implement them.
pub struct AgentRegistry {
    agents: Vec<RegisteredAgent>,
    index: HashMap<AgentId, usize>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.agents.iter().map(|a| &a.spec))
            .finish()
    }
}

#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: Vec<RegisteredAgent>,
}

impl AgentRegistryBuilder {
    /// Add an agent. Registration order is the tie-break order for scheduling.
    pub fn register(mut self, spec: AgentSpec, handler: impl AgentHandler + 'static) -> Self {
        self.agents.push(RegisteredAgent {
            spec,
            handler: Arc::new(handler),
        });
        self
    }

    pub fn register_shared(mut self, spec: AgentSpec, handler: Arc<dyn AgentHandler>) -> Self {
        self.agents.push(RegisteredAgent { spec, handler });
        self
    }

    pub fn build(self) -> Result<AgentRegistry> {
        let mut index = HashMap::with_capacity(self.agents.len());
        for (i, agent) in self.agents.iter().enumerate() {
            if agent.spec.id == ALL_AGENTS {
                return Err(OrchestratorError::Configuration(format!(
                    "agent id {ALL_AGENTS:?} is reserved for whole-pipeline runs"
                )));
            }
            if index.insert(agent.spec.id.clone(), i).is_some() {
                return Err(OrchestratorError::Configuration(format!(
                    "duplicate agent id: {}",
                    agent.spec.id
                )));
            }
        }

        for agent in &self.agents {
            let mut declared = HashSet::new();
            for dep in &agent.spec.dependencies {
                if !declared.insert(dep) {
                    return Err(OrchestratorError::Configuration(format!(
                        "agent {} lists dependency {} twice",
                        agent.spec.id, dep
                    )));
                }
                if dep == &agent.spec.id {
                    return Err(OrchestratorError::Configuration(format!(
                        "agent {} depends on itself",
                        agent.spec.id
                    )));
                }
                if !index.contains_key(dep) {
                    return Err(OrchestratorError::Configuration(format!(
                        "agent {} depends on unregistered agent {}",
                        agent.spec.id, dep
                    )));
                }
            }
        }

        let registry = AgentRegistry {
            agents: self.agents,
            index,
        };
        if let Some(cycle) = registry.find_cycle() {
            let path: Vec<&str> = cycle
                .iter()
                .map(|&i| registry.agents[i].spec.id.as_str())
                .collect();
            return Err(OrchestratorError::Configuration(format!(
                "dependency cycle: {}",
                path.join(" -> ")
            )));
        }

        debug!(agents = registry.len(), "agent registry built");
        Ok(registry)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    /// All specs in registration order.
    pub fn list_agents(&self) -> Vec<&AgentSpec> {
        self.agents.iter().map(|a| &a.spec).collect()
    }

    pub fn get_agent(&self, id: &str) -> Result<&AgentSpec> {
        self.position(id)
            .map(|i| &self.agents[i].spec)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AgentId> {
        self.agents.iter().map(|a| &a.spec.id)
    }

    /// Registration index of `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        // AgentId validation guarantees any registered key is a valid id;
        // invalid strings simply miss.
        AgentId::new(id)
            .ok()
            .and_then(|key| self.index.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub(crate) fn handler(&self, id: &AgentId) -> Result<Arc<dyn AgentHandler>> {
        self.position(id.as_str())
            .map(|i| Arc::clone(&self.agents[i].handler))
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Agents that declare `id` as a direct dependency, in registration order.
    pub fn dependents(&self, id: &AgentId) -> Vec<&AgentId> {
        self.agents
            .iter()
            .filter(|a| a.spec.depends_on(id))
            .map(|a| &a.spec.id)
            .collect()
    }

    /// Every agent that depends on `id` directly or through other agents,
    /// in registration order.
    pub fn transitive_dependents(&self, id: &AgentId) -> Vec<&AgentId> {
        let mut seen: HashSet<&AgentId> = HashSet::new();
        let mut queue: VecDeque<&AgentId> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for dependent in self.dependents(current) {
                if seen.insert(dependent) {
                    queue.push_back(dependent);
                }
            }
        }
        self.ids().filter(|i| seen.contains(i)).collect()
    }

    /// Depth-first search with an on-stack mark; returns the indices forming
    /// the first cycle found, closed with its starting node.
    fn find_cycle(&self) -> Option<Vec<usize>> {
        let mut marks = vec![Mark::Unvisited; self.agents.len()];
        let mut stack = Vec::new();
        for start in 0..self.agents.len() {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = self.visit(start, &mut marks, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[node] = Mark::OnStack;
        stack.push(node);
        for dep in &self.agents[node].spec.dependencies {
            let next = self.index[dep];
            match marks[next] {
                Mark::OnStack => {
                    let from = stack.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = stack[from..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = self.visit(next, marks, stack) {
                        return Some(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        stack.pop();
        marks[node] = Mark::Done;
        None
    }
}
