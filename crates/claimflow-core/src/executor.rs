//! Agent execution with uniform failure capture.
//!
//! Each agent's domain function is an [`AgentHandler`]. The executor runs it
//! on its own tokio task bounded by a timeout, so a panic, a hang or a
//! mistyped output becomes an [`Outcome::Failure`] instead of taking down the
//! coordinator. The executor never retries.

use std::any::Any;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{instrument, warn};

use crate::domain::{AgentFailure, AgentId, AgentOutput, Claim, FailureKind, Outcome};
use crate::metrics::METRICS;
use crate::obs;

/// Input handed to an agent's domain function.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub claim: Arc<Claim>,
    /// Outputs of the agent's declared dependencies, all of which are complete.
    pub prior: BTreeMap<AgentId, AgentOutput>,
}

impl AgentContext {
    pub fn prior_output(&self, agent_id: &str) -> Option<&AgentOutput> {
        self.prior
            .iter()
            .find(|(id, _)| *id == agent_id)
            .map(|(_, output)| output)
    }
}

/// Domain function for one agent: `(claim, prior outputs) -> output`.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure>;
}

/// [`AgentHandler`] backed by an async closure.
pub struct FnHandler<F>(F);

/// Wrap an async closure as an [`AgentHandler`].
///
/// ```ignore
/// let handler = handler_fn(|ctx: AgentContext| async move {
///     Ok(AgentOutput::Opaque(serde_json::json!({ "claim": ctx.claim.claim_id })))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(AgentContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentOutput, AgentFailure>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> AgentHandler for FnHandler<F>
where
    F: Fn(AgentContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<AgentOutput, AgentFailure>> + Send,
{
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        (self.0)(ctx).await
    }
}

/// Runs one agent and normalises whatever happens into an [`Outcome`].
#[derive(Debug, Clone)]
pub struct AgentExecutor {
    timeout: Duration,
}

impl AgentExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip(self, handler, ctx), fields(agent_id = %ctx.agent_id))]
    pub async fn execute(&self, handler: Arc<dyn AgentHandler>, ctx: AgentContext) -> Outcome {
        let agent_id = ctx.agent_id.clone();
        let started = Instant::now();

        let mut task = tokio::spawn(async move { handler.handle(ctx).await });
        let outcome = match tokio::time::timeout(self.timeout, &mut task).await {
            Err(_) => {
                task.abort();
                METRICS.inc_agent_timeouts();
                Outcome::Failure(AgentFailure::new(
                    FailureKind::Timeout,
                    format!("agent did not finish within {:?}", self.timeout),
                ))
            }
            Ok(Err(join_err)) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                warn!(agent_id = %agent_id, panic = %message, "agent panicked");
                Outcome::Failure(AgentFailure::new(
                    FailureKind::Panicked,
                    format!("agent panicked: {message}"),
                ))
            }
            Ok(Err(join_err)) => Outcome::Failure(AgentFailure::domain(format!(
                "agent task cancelled: {join_err}"
            ))),
            Ok(Ok(Err(failure))) => Outcome::Failure(failure),
            Ok(Ok(Ok(output))) => check_output(&agent_id, output),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Outcome::Success(_) => obs::emit_agent_finished(&agent_id, duration_ms, true, None),
            Outcome::Failure(f) => {
                METRICS.inc_agents_failed();
                obs::emit_agent_finished(&agent_id, duration_ms, false, Some(f.kind))
            }
        }
        outcome
    }
}

/// A typed output must come from the agent it names.
fn check_output(agent_id: &AgentId, output: AgentOutput) -> Outcome {
    match output.producing_agent() {
        Some(producer) if agent_id != producer => Outcome::Failure(AgentFailure::new(
            FailureKind::InvalidOutput,
            format!("agent {agent_id} returned a {producer} output"),
        )),
        _ => Outcome::Success(output),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
