//! Observability tests for run and agent lifecycle tracing.
//!
//! Verifies that structured events are emitted for run start, agent
//! start/finish, invalidation and run finish, and that counters move.

use std::sync::Arc;

use claimflow_core::metrics::METRICS;
use claimflow_core::obs::{emit_agent_finished, emit_run_rejected, emit_run_started, run_span};
use claimflow_core::{
    handler_fn, AgentContext, AgentFailure, AgentId, AgentOutput, AgentRegistry, AgentSpec,
    Claim, ClaimId, FailureKind, MemoryStateStore, Orchestrator, OrchestratorConfig, RunRequest,
};
use serde_json::json;
use tracing_test::traced_test;

fn claim() -> Claim {
    serde_json::from_value(json!({
        "claim_id": "CLM-OBS-1",
        "incident_data": {
            "date": "2024-05-01", "time": "10:00", "location": "Princeton, NJ",
            "type": "parking lot", "description": "Scraped while parked."
        },
        "vehicle_data": {
            "year": 2018, "make": "Subaru", "model": "Outback", "license_plate": "NJ-1"
        },
        "insurance_data": {
            "provider": "Garden State Mutual", "policy_number": "GSM-1",
            "coverage_type": "comprehensive", "deductible": 250
        },
        "damage_data": { "description": "Scratch along the rear door." },
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z"
    }))
    .expect("valid claim fixture")
}

fn orchestrator() -> Orchestrator {
    let ok = || {
        handler_fn(|ctx: AgentContext| async move {
            Ok(AgentOutput::Opaque(json!({ "agent": ctx.agent_id.as_str() })))
        })
    };
    let registry = AgentRegistry::builder()
        .register(AgentSpec::new("core_agent", "Core", "stub", &[]).unwrap(), ok())
        .register(
            AgentSpec::new("fintrack", "FinTrack", "stub", &["core_agent"]).unwrap(),
            handler_fn(|_ctx: AgentContext| async move {
                Err(AgentFailure::domain("pricing service unavailable"))
            }),
        )
        .build()
        .unwrap();
    Orchestrator::new(
        registry,
        Arc::new(MemoryStateStore::new()),
        &OrchestratorConfig::default(),
    )
}

#[traced_test]
#[test]
fn test_emit_run_started_logs_target() {
    emit_run_started("run-123", "CLM-1", "all", true);
    assert!(logs_contain("run.started"));
    assert!(logs_contain("CLM-1"));
}

#[traced_test]
#[test]
fn test_emit_agent_finished_logs_failure_kind() {
    let agent = AgentId::new("fintrack").unwrap();
    emit_agent_finished(&agent, 42, false, Some(FailureKind::Timeout));
    assert!(logs_contain("agent.finished"));
    assert!(logs_contain("timeout"));
}

#[traced_test]
#[test]
fn test_emit_run_rejected_logs_warning() {
    emit_run_rejected("CLM-2", &"a run is already in progress");
    assert!(logs_contain("run.rejected"));
}

#[traced_test]
#[test]
fn test_run_span_creates_span() {
    let span = run_span("run-span-1", "CLM-3");
    let _entered = span.enter();
    emit_run_started("run-span-1", "CLM-3", "core_agent", false);
    assert!(logs_contain("claimflow.run"));
}

#[traced_test]
#[tokio::test]
async fn test_run_emits_lifecycle_events() {
    let orch = orchestrator();

    orch.run(RunRequest::all(ClaimId::new("CLM-OBS-1")), &claim())
        .await
        .unwrap();

    assert!(logs_contain("run.started"));
    assert!(logs_contain("agent.started"));
    assert!(logs_contain("agent.finished"));
    assert!(logs_contain("pricing service unavailable"));
    assert!(logs_contain("run.finished"));
    assert!(logs_contain("CLM-OBS-1"));
}

#[traced_test]
#[tokio::test]
async fn test_rejected_run_is_logged_and_counted() {
    let orch = orchestrator();
    let before = METRICS.runs_rejected();

    let err = orch
        .run(
            RunRequest::agent(ClaimId::new("CLM-OBS-1"), "fintrack").unwrap(),
            &claim(),
        )
        .await;

    assert!(err.is_err());
    assert!(logs_contain("run.rejected"));
    // counters are process-wide; other tests may run concurrently
    assert!(METRICS.runs_rejected() > before);
}
