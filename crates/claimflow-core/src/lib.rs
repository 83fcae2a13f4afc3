//! Claimflow Core Library
//!
//! Dependency-ordered orchestration of claim analysis agents. Agents are
//! registered with their prerequisites, resolved into a topological order,
//! executed one at a time with a per-agent timeout, and their state is
//! persisted per claim through `claimflow-state`.

pub mod actions;
pub mod agents;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod executor;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod resolver;
pub mod telemetry;

pub use actions::{derive_actions, ClaimAction};
pub use agents::{builtin_registry, builtin_specs};
pub use config::{OrchestratorConfig, StoreConfig};
pub use coordinator::Orchestrator;
pub use executor::{handler_fn, AgentContext, AgentExecutor, AgentHandler, FnHandler};
pub use registry::{AgentRegistry, AgentRegistryBuilder};
pub use resolver::DependencyResolver;

pub use domain::{
    AgentFailure, AgentId, AgentOutput, AgentRunState, AgentSpec, AgentStateEntry, Claim,
    ClaimStatus, FailureKind, OrchestratorError, OrchestratorState, Outcome, ProgressEvent,
    Result, RunRequest, RunResult, RunStatus, RunTarget, Transition, TransitionDetail,
};

pub use claimflow_state::{
    AgentRunRecord, AgentStatus, ClaimId, ContentDigest, MemoryStateStore, StateStore,
    SurrealStateStore,
};

/// Crate version, shared by every workspace member.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
