//! Domain models for claimflow.
//!
//! Canonical definitions for the core entities:
//! - `Claim`: the record under analysis, owned by the surrounding application
//! - `AgentSpec`: static definition of one agent and its dependencies
//! - `AgentOutput` / `Outcome`: typed results of a single agent execution
//! - `OrchestratorState`: per-claim map of agent id to run state
//! - `RunRequest` / `RunResult`: one coordinator invocation and its report

pub mod agent;
pub mod claim;
pub mod error;
pub mod output;
pub mod run;
pub mod state;

pub use agent::{AgentId, AgentSpec};
pub use claim::{
    Claim, ClaimStatus, CoverageType, DamageData, DamageSeverity, IncidentData, IncidentType,
    InsuranceData, PoliceReportData, VehicleData,
};
pub use error::{OrchestratorError, Result};
pub use output::{AgentFailure, AgentOutput, FailureKind, Outcome};
pub use run::{
    ProgressEvent, RunRequest, RunResult, RunStatus, RunTarget, Transition, TransitionDetail,
};
pub use state::{AgentRunState, AgentStateEntry, OrchestratorState};
