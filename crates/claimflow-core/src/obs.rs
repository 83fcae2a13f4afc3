//! Structured observability hooks for orchestration runs.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for run and agent lifecycle events
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).
//! For JSON output, set `CLAIMFLOW_LOG_FORMAT=json`.

use tracing::info;

use crate::domain::{AgentId, FailureKind, RunStatus};

/// Span tagging every event of one run with its run and claim ids.
///
/// Attach it with `tracing::Instrument::instrument` so it follows the run
/// across await points.
pub fn run_span(run_id: &str, claim_id: &str) -> tracing::Span {
    tracing::info_span!("claimflow.run", run_id = %run_id, claim_id = %claim_id)
}

/// Emit event: run accepted, with target and force flag.
pub fn emit_run_started(run_id: &str, claim_id: &str, target: &str, force: bool) {
    info!(
        event = "run.started",
        run_id = %run_id,
        claim_id = %claim_id,
        target = %target,
        force = force,
    );
}

/// Emit event: run finished.
pub fn emit_run_finished(run_id: &str, status: RunStatus, executed: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        status = ?status,
        executed = executed,
        duration_ms = duration_ms,
    );
}

/// Emit event: run rejected before any agent started (warning level).
pub fn emit_run_rejected(claim_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "run.rejected", claim_id = %claim_id, error = %error);
}

pub fn emit_agent_started(agent_id: &AgentId) {
    info!(event = "agent.started", agent_id = %agent_id);
}

pub fn emit_agent_finished(
    agent_id: &AgentId,
    duration_ms: u64,
    success: bool,
    failure: Option<FailureKind>,
) {
    info!(
        event = "agent.finished",
        agent_id = %agent_id,
        duration_ms = duration_ms,
        success = success,
        failure = failure.map(|k| k.as_str()).unwrap_or(""),
    );
}

/// Emit event: a complete agent was reset to idle by a forced re-run upstream.
pub fn emit_agent_invalidated(agent_id: &AgentId, by: &AgentId) {
    info!(event = "agent.invalidated", agent_id = %agent_id, by = %by);
}

/// Emit event: an agent was not started because a dependency is not complete.
pub fn emit_agent_blocked(agent_id: &AgentId, blocker: &AgentId) {
    info!(event = "agent.blocked", agent_id = %agent_id, blocked_by = %blocker);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("run-1", "CLM-1");
        let _entered = span.enter();
        emit_run_started("run-1", "CLM-1", "all", false);
    }
}
