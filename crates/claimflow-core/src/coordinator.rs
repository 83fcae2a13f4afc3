//! Run coordinator: the orchestrator's public entry point.
//!
//! A run resolves its target set, orders it by dependency, then executes
//! agents one at a time, persisting each status change before moving on.
//! Structural problems (unknown agent, skipped prerequisite, overlapping
//! run) are returned as errors before any agent starts. Agent failures are
//! recorded in state and reported inside the [`RunResult`].

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;
use claimflow_state::{
    AgentRunRecord, AgentStatus, ClaimId, ContentDigest, StateStore, StorageError,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{instrument, warn, Instrument};
use uuid::Uuid;

use crate::actions::derive_actions;
use crate::config::OrchestratorConfig;
use crate::domain::{
    AgentFailure, AgentId, AgentOutput, AgentRunState, Claim, OrchestratorError,
    OrchestratorState, Outcome, ProgressEvent, Result, RunRequest, RunResult, RunStatus,
    RunTarget, Transition, TransitionDetail,
};
use crate::executor::{AgentContext, AgentExecutor};
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::AgentRegistry;
use crate::resolver::DependencyResolver;

type ActiveRuns = Arc<Mutex<HashSet<ClaimId>>>;

/// Marks a claim as having a run in flight; released on drop.
struct RunGuard {
    claim_id: ClaimId,
    active: ActiveRuns,
}

impl RunGuard {
    fn acquire(active: &ActiveRuns, claim_id: &ClaimId) -> Result<Self> {
        let mut runs = active.lock().unwrap_or_else(PoisonError::into_inner);
        if !runs.insert(claim_id.clone()) {
            return Err(OrchestratorError::ConcurrentRun {
                claim_id: claim_id.to_string(),
            });
        }
        Ok(Self {
            claim_id: claim_id.clone(),
            active: Arc::clone(active),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.claim_id);
    }
}

/// Dependency-ordered agent orchestration over a [`StateStore`].
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    store: Arc<dyn StateStore>,
    executor: AgentExecutor,
    active_runs: ActiveRuns,
}

impl Orchestrator {
    pub fn new(
        registry: AgentRegistry,
        store: Arc<dyn StateStore>,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            store,
            executor: AgentExecutor::new(config.agent_timeout()),
            active_runs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Read-only snapshot of every registered agent's state for a claim.
    /// A claim never seen before reads as all `idle`.
    #[instrument(skip(self), fields(claim_id = %claim_id))]
    pub async fn get_state(&self, claim_id: &ClaimId) -> Result<OrchestratorState> {
        validate_claim_id(claim_id)?;
        let records = self.store.load(claim_id).await?;
        Ok(OrchestratorState::from_records(
            claim_id.clone(),
            self.registry.ids(),
            records,
        ))
    }

    /// Execute `request` against the `claim` snapshot.
    ///
    /// A storage failure mid-run aborts the run with `Storage`; transitions
    /// recorded before it are not returned. If the failing write was an
    /// agent's outcome, the agent's `running` row is replaced with an
    /// `error` row when the store accepts it, so the agent stays rerunnable.
    pub async fn run(&self, request: RunRequest, claim: &Claim) -> Result<RunResult> {
        self.execute_run(request, claim, None).await
    }

    /// Like [`Orchestrator::run`], also streaming [`ProgressEvent`]s as the
    /// run advances. A dropped receiver does not affect the run.
    pub async fn run_with_progress(
        &self,
        request: RunRequest,
        claim: &Claim,
        progress: UnboundedSender<ProgressEvent>,
    ) -> Result<RunResult> {
        self.execute_run(request, claim, Some(&progress)).await
    }

    async fn execute_run(
        &self,
        request: RunRequest,
        claim: &Claim,
        progress: Option<&UnboundedSender<ProgressEvent>>,
    ) -> Result<RunResult> {
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string(), request.claim_id.as_str());
        self.run_inner(run_id, request, claim, progress)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        request: RunRequest,
        claim: &Claim,
        progress: Option<&UnboundedSender<ProgressEvent>>,
    ) -> Result<RunResult> {
        let started_at = Utc::now();
        let clock = Instant::now();

        let (_guard, mut state, order) = match self.prepare(&request, claim).await {
            Ok(prepared) => prepared,
            Err(e) => {
                METRICS.inc_runs_rejected();
                obs::emit_run_rejected(request.claim_id.as_str(), &e);
                return Err(e);
            }
        };

        METRICS.inc_runs_started();
        obs::emit_run_started(
            &run_id.to_string(),
            request.claim_id.as_str(),
            &request.target.to_string(),
            request.force,
        );

        let digest = claim.digest()?;
        let snapshot = Arc::new(claim.clone());
        let resolver = DependencyResolver::new(&self.registry);
        let mut transitions: Vec<Transition> = Vec::new();
        let record = |transitions: &mut Vec<Transition>, t: Transition| {
            if let Some(tx) = progress {
                let _ = tx.send(ProgressEvent::Transition(t.clone()));
            }
            transitions.push(t);
        };

        for agent_id in &order {
            let previous = state.status(agent_id.as_str());

            if previous == AgentStatus::Complete && !request.force {
                record(
                    &mut transitions,
                    Transition {
                        agent_id: agent_id.clone(),
                        from: previous,
                        to: previous,
                        detail: TransitionDetail::AlreadyComplete,
                    },
                );
                continue;
            }

            // Prerequisites in this run may have failed or been blocked.
            if let Some(blocker) = resolver.first_blocker(agent_id.as_str(), &state)? {
                obs::emit_agent_blocked(agent_id, blocker);
                record(
                    &mut transitions,
                    Transition {
                        agent_id: agent_id.clone(),
                        from: previous,
                        to: previous,
                        detail: TransitionDetail::BlockedBy {
                            agent: blocker.clone(),
                        },
                    },
                );
                continue;
            }

            // Re-running a complete agent makes its complete dependents stale;
            // they go back to idle in the same write that marks it running.
            let running = AgentRunState::running(digest.clone());
            let mut batch = vec![(agent_id.to_string(), running.to_record()?)];
            let mut invalidated = Vec::new();
            if previous == AgentStatus::Complete {
                for dependent in self.registry.transitive_dependents(agent_id) {
                    if state.status(dependent.as_str()) == AgentStatus::Complete {
                        batch.push((dependent.to_string(), AgentRunRecord::idle()));
                        invalidated.push(dependent.clone());
                    }
                }
            }
            self.store.put_many(&request.claim_id, batch).await?;
            state.set(agent_id, running);

            METRICS.add_invalidations(invalidated.len() as u64);
            for dependent in invalidated {
                obs::emit_agent_invalidated(&dependent, agent_id);
                state.set(&dependent, AgentRunState::idle());
                record(
                    &mut transitions,
                    Transition {
                        agent_id: dependent,
                        from: AgentStatus::Complete,
                        to: AgentStatus::Idle,
                        detail: TransitionDetail::Invalidated {
                            by: agent_id.clone(),
                        },
                    },
                );
            }

            obs::emit_agent_started(agent_id);
            if let Some(tx) = progress {
                let _ = tx.send(ProgressEvent::AgentStarted {
                    agent_id: agent_id.clone(),
                });
            }

            let ctx = AgentContext {
                agent_id: agent_id.clone(),
                claim: Arc::clone(&snapshot),
                prior: self.prior_outputs(agent_id, &state)?,
            };
            let handler = self.registry.handler(agent_id)?;
            METRICS.inc_agents_executed();

            let (next, detail) = match self.executor.execute(handler, ctx).await {
                Outcome::Success(output) => (
                    AgentRunState::complete(output.clone(), digest.clone()),
                    TransitionDetail::Output { output },
                ),
                Outcome::Failure(failure) => {
                    warn!(
                        agent_id = %agent_id,
                        kind = %failure.kind,
                        error = %failure.message,
                        "agent failed"
                    );
                    (
                        AgentRunState::failed(failure.clone(), digest.clone()),
                        TransitionDetail::Failure { failure },
                    )
                }
            };

            let written = self
                .store
                .put(&request.claim_id, agent_id.as_str(), next.to_record()?)
                .await;
            if let Err(e) = written {
                self.release_running(&request.claim_id, agent_id, &e, &digest)
                    .await;
                return Err(e.into());
            }
            let to = next.status;
            state.set(agent_id, next);
            record(
                &mut transitions,
                Transition {
                    agent_id: agent_id.clone(),
                    from: previous,
                    to,
                    detail,
                },
            );
        }

        let status = if transitions
            .iter()
            .any(|t| matches!(t.detail, TransitionDetail::Failure { .. }))
        {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Completed
        };

        let actions = derive_actions(claim, &transitions);
        let duration_ms = clock.elapsed().as_millis() as u64;
        let executed = transitions.iter().filter(|t| t.executed()).count();
        obs::emit_run_finished(&run_id.to_string(), status, executed, duration_ms);
        METRICS.flush();

        Ok(RunResult {
            run_id,
            claim_id: request.claim_id,
            status,
            transitions,
            actions,
            started_at,
            duration_ms,
        })
    }

    /// Everything that can reject a run, checked before any state changes.
    async fn prepare(
        &self,
        request: &RunRequest,
        claim: &Claim,
    ) -> Result<(RunGuard, OrchestratorState, Vec<AgentId>)> {
        validate_claim_id(&request.claim_id)?;
        if claim.claim_id != request.claim_id.as_str() {
            return Err(OrchestratorError::ClaimMismatch {
                requested: request.claim_id.to_string(),
                snapshot: claim.claim_id.clone(),
            });
        }

        let targets: Vec<AgentId> = match &request.target {
            RunTarget::All => self.registry.ids().cloned().collect(),
            RunTarget::Agent(id) => {
                self.registry.get_agent(id.as_str())?;
                vec![id.clone()]
            }
        };

        let guard = RunGuard::acquire(&self.active_runs, &request.claim_id)?;
        let state = self.get_state(&request.claim_id).await?;
        let order =
            DependencyResolver::new(&self.registry).topological_run_order(&targets, &state)?;
        Ok((guard, state, order))
    }

    /// Replace a `running` row with an `error` row after the outcome write
    /// failed. Only succeeds if the store has recovered.
    async fn release_running(
        &self,
        claim_id: &ClaimId,
        agent_id: &AgentId,
        cause: &StorageError,
        digest: &ContentDigest,
    ) {
        let failure = AgentFailure::domain(format!("recording the outcome failed: {cause}"));
        let record = match AgentRunState::failed(failure, digest.clone()).to_record() {
            Ok(record) => record,
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "could not encode failure record");
                return;
            }
        };
        if let Err(e) = self.store.put(claim_id, agent_id.as_str(), record).await {
            warn!(agent_id = %agent_id, error = %e, "agent left in running state");
        }
    }

    fn prior_outputs(
        &self,
        agent_id: &AgentId,
        state: &OrchestratorState,
    ) -> Result<BTreeMap<AgentId, AgentOutput>> {
        let spec = self.registry.get_agent(agent_id.as_str())?;
        Ok(spec
            .dependencies
            .iter()
            .filter_map(|dep| state.output(dep.as_str()).map(|o| (dep.clone(), o.clone())))
            .collect())
    }
}

fn validate_claim_id(claim_id: &ClaimId) -> Result<()> {
    if claim_id.as_str().trim().is_empty() {
        return Err(OrchestratorError::InvalidId(
            "claim id must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_guard_is_exclusive_per_claim() {
        let active: ActiveRuns = Arc::new(Mutex::new(HashSet::new()));
        let a = ClaimId::new("a");

        let guard = RunGuard::acquire(&active, &a).unwrap();
        assert!(matches!(
            RunGuard::acquire(&active, &a),
            Err(OrchestratorError::ConcurrentRun { .. })
        ));
        assert!(RunGuard::acquire(&active, &ClaimId::new("b")).is_ok());

        drop(guard);
        assert!(RunGuard::acquire(&active, &a).is_ok());
    }

    #[test]
    fn test_empty_claim_id_rejected() {
        assert!(validate_claim_id(&ClaimId::new("  ")).is_err());
        assert!(validate_claim_id(&ClaimId::new("CLM-1")).is_ok());
    }
}
