//! Global atomic counters for orchestration.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the coordinator does so at the end of each run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_started: AtomicU64,
    runs_rejected: AtomicU64,
    agents_executed: AtomicU64,
    agents_failed: AtomicU64,
    agent_timeouts: AtomicU64,
    invalidations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_started: AtomicU64::new(0),
            runs_rejected: AtomicU64::new(0),
            agents_executed: AtomicU64::new(0),
            agents_failed: AtomicU64::new(0),
            agent_timeouts: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_started", "counter incremented");
    }

    pub fn inc_runs_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_rejected", "counter incremented");
    }

    pub fn inc_agents_executed(&self) {
        self.agents_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_executed", "counter incremented");
    }

    pub fn inc_agents_failed(&self) {
        self.agents_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_failed", "counter incremented");
    }

    pub fn inc_agent_timeouts(&self) {
        self.agent_timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agent_timeouts", "counter incremented");
    }

    pub fn add_invalidations(&self, n: u64) {
        self.invalidations.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "invalidations", n, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_started = self.runs_started(),
            runs_rejected = self.runs_rejected(),
            agents_executed = self.agents_executed(),
            agents_failed = self.agents_failed(),
            agent_timeouts = self.agent_timeouts(),
            invalidations = self.invalidations(),
        );
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started.load(Ordering::Relaxed)
    }

    pub fn runs_rejected(&self) -> u64 {
        self.runs_rejected.load(Ordering::Relaxed)
    }

    pub fn agents_executed(&self) -> u64 {
        self.agents_executed.load(Ordering::Relaxed)
    }

    pub fn agents_failed(&self) -> u64 {
        self.agents_failed.load(Ordering::Relaxed)
    }

    pub fn agent_timeouts(&self) -> u64 {
        self.agent_timeouts.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.runs_started.store(0, Ordering::Relaxed);
        self.runs_rejected.store(0, Ordering::Relaxed);
        self.agents_executed.store(0, Ordering::Relaxed);
        self.agents_failed.store(0, Ordering::Relaxed);
        self.agent_timeouts.store(0, Ordering::Relaxed);
        self.invalidations.store(0, Ordering::Relaxed);
    }
}
