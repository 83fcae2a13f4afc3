//! Run requests, transitions and run reports.

use chrono::{DateTime, Utc};
use claimflow_state::{AgentStatus, ClaimId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentId;
use super::error::{OrchestratorError, Result};
use super::output::{AgentFailure, AgentOutput};
use crate::actions::ClaimAction;

/// Run target name meaning every registered agent; never a valid agent id.
pub const ALL_AGENTS: &str = "all";

/// What a run should execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTarget {
    Agent(AgentId),
    All,
}

impl std::str::FromStr for RunTarget {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self> {
        if s == ALL_AGENTS {
            Ok(RunTarget::All)
        } else {
            Ok(RunTarget::Agent(target_id(s)?))
        }
    }
}

/// A malformed name cannot match any registered agent.
fn target_id(name: &str) -> Result<AgentId> {
    AgentId::new(name).map_err(|_| OrchestratorError::NotFound(name.to_string()))
}

impl std::fmt::Display for RunTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTarget::Agent(id) => write!(f, "{id}"),
            RunTarget::All => f.write_str(ALL_AGENTS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    pub claim_id: ClaimId,
    pub target: RunTarget,
    /// Re-execute targeted agents even when already complete.
    #[serde(default)]
    pub force: bool,
}

impl RunRequest {
    pub fn all(claim_id: ClaimId) -> Self {
        Self {
            claim_id,
            target: RunTarget::All,
            force: false,
        }
    }

    pub fn agent(claim_id: ClaimId, agent_id: &str) -> Result<Self> {
        Ok(Self {
            claim_id,
            target: RunTarget::Agent(target_id(agent_id)?),
            force: false,
        })
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// What accompanied a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionDetail {
    Output { output: AgentOutput },
    Failure { failure: AgentFailure },
    /// Already complete and not forced; the agent was not invoked.
    AlreadyComplete,
    /// Not started because a dependency failed earlier in this run.
    BlockedBy { agent: AgentId },
    /// Reset to idle because a dependency was forcibly re-run.
    Invalidated { by: AgentId },
}

/// One `(agent, from, to, detail)` entry of a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub agent_id: AgentId,
    pub from: AgentStatus,
    pub to: AgentStatus,
    pub detail: TransitionDetail,
}

impl Transition {
    pub fn output(&self) -> Option<&AgentOutput> {
        match &self.detail {
            TransitionDetail::Output { output } => Some(output),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&AgentFailure> {
        match &self.detail {
            TransitionDetail::Failure { failure } => Some(failure),
            _ => None,
        }
    }

    /// Whether the agent's domain function was invoked for this transition.
    pub fn executed(&self) -> bool {
        matches!(
            self.detail,
            TransitionDetail::Output { .. } | TransitionDetail::Failure { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every targeted agent reached `complete`.
    Completed,
    /// At least one targeted agent ended in `error`.
    PartiallyFailed,
}

/// Report of one coordinator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub claim_id: ClaimId,
    pub status: RunStatus,
    pub transitions: Vec<Transition>,
    pub actions: Vec<ClaimAction>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunResult {
    /// The last transition recorded for `agent_id`.
    pub fn transition(&self, agent_id: &str) -> Option<&Transition> {
        self.transitions.iter().rev().find(|t| t.agent_id == agent_id)
    }

    /// Agents whose domain function ran, in execution order.
    pub fn executed(&self) -> Vec<&AgentId> {
        self.transitions
            .iter()
            .filter(|t| t.executed())
            .map(|t| &t.agent_id)
            .collect()
    }

    pub fn failed(&self) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.failure().is_some())
            .collect()
    }
}

/// Incremental progress emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    AgentStarted { agent_id: AgentId },
    Transition(Transition),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_target_parse() {
        assert_eq!("all".parse::<RunTarget>().unwrap(), RunTarget::All);
        assert_eq!(
            "fintrack".parse::<RunTarget>().unwrap(),
            RunTarget::Agent(AgentId::new("fintrack").unwrap())
        );
        assert!(matches!(
            "Fin Track".parse::<RunTarget>(),
            Err(OrchestratorError::NotFound(_))
        ));
        assert_eq!(RunTarget::All.to_string(), "all");
    }

    #[test]
    fn test_request_builders() {
        let req = RunRequest::agent(ClaimId::new("c1"), "core_agent")
            .unwrap()
            .forced();
        assert!(req.force);
        assert!(!RunRequest::all(ClaimId::new("c1")).force);
    }

    #[test]
    fn test_transition_detail_wire_shape() {
        let t = Transition {
            agent_id: AgentId::new("fintrack").unwrap(),
            from: AgentStatus::Complete,
            to: AgentStatus::Idle,
            detail: TransitionDetail::Invalidated {
                by: AgentId::new("core_agent").unwrap(),
            },
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["from"], "complete");
        assert_eq!(json["to"], "idle");
        assert_eq!(json["detail"]["kind"], "invalidated");
        assert_eq!(json["detail"]["by"], "core_agent");
        assert!(!t.executed());
    }

    #[test]
    fn test_progress_event_tagging() {
        let event = ProgressEvent::AgentStarted {
            agent_id: AgentId::new("drafting").unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "agent_started");
        assert_eq!(json["agent_id"], "drafting");
    }
}
