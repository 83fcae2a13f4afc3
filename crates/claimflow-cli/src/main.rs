//! Claimflow - claim analysis orchestrator CLI
//!
//! The `claimflow` command runs the built-in claim agents against a claim
//! snapshot and inspects the per-claim orchestrator state.
//!
//! ## Commands
//!
//! - `agents`: List registered agents and their dependencies
//! - `state`: Show every agent's status for a claim
//! - `run`: Run one agent, or all of them, against a claim JSON file
//! - `claims`: List claims with stored orchestrator state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use claimflow_core::{
    builtin_registry, telemetry, AgentId, AgentRegistry, AgentStatus, Claim, ClaimAction,
    ClaimId, Orchestrator, OrchestratorConfig, OrchestratorState, ProgressEvent, RunRequest,
    RunResult, RunTarget, StoreConfig, TransitionDetail,
};
use claimflow_state::{MemoryStateStore, StateStore, SurrealStateStore};
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "claimflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Dependency-ordered claim analysis agents", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Print command results as JSON instead of text
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true, env = "CLAIMFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// State backend (overrides the configuration file)
    #[arg(long, global = true, value_enum)]
    store: Option<StoreKind>,

    /// SurrealDB endpoint for `--store surreal`
    #[arg(long, global = true)]
    db_url: Option<String>,

    /// Database directory for `--store local`
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Memory,
    Surreal,
    Local,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered agents in run order with their dependencies
    Agents,

    /// Show orchestrator state for a claim
    State {
        /// Claim identifier
        claim_id: String,

        /// Claim JSON file; marks agents whose output predates it as stale
        #[arg(long)]
        claim: Option<PathBuf>,
    },

    /// Run agents against a claim snapshot
    Run {
        /// Path to the claim JSON file
        claim: PathBuf,

        /// Agent id to run, or `all`
        #[arg(short, long, default_value = "all")]
        target: String,

        /// Re-run agents that are already complete
        #[arg(short, long)]
        force: bool,
    },

    /// List claims with stored orchestrator state
    Claims,
}

impl Commands {
    /// `agents` only reads the static registry and never touches the database.
    fn uses_store(&self) -> bool {
        !matches!(self, Commands::Agents)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        telemetry::parse_level(&config.log_level)
    };
    telemetry::init_tracing(cli.json || config.log_json, level);

    let registry = builtin_registry().context("Failed to build agent registry")?;

    if !cli.command.uses_store() {
        return cmd_agents(&registry, cli.format);
    }

    let store = open_store(&config.store)
        .await
        .context("Failed to open orchestrator state store")?;
    let orchestrator = Orchestrator::new(registry, store.clone(), &config);

    match cli.command {
        Commands::Agents => cmd_agents(orchestrator.registry(), cli.format),
        Commands::State { claim_id, claim } => {
            cmd_state(&orchestrator, &claim_id, claim.as_deref(), cli.format).await
        }
        Commands::Run {
            claim,
            target,
            force,
        } => cmd_run(&orchestrator, &claim, &target, force, cli.format).await,
        Commands::Claims => cmd_claims(store.as_ref(), cli.format).await,
    }
}

/// Configuration file and environment, then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<OrchestratorConfig> {
    let mut config = OrchestratorConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.store {
        Some(StoreKind::Memory) => config.store = StoreConfig::Memory,
        Some(StoreKind::Surreal) => {
            let url = cli
                .db_url
                .clone()
                .or_else(|| match &config.store {
                    StoreConfig::Surreal { url } => Some(url.clone()),
                    _ => None,
                })
                .context("--store surreal requires --db-url or SURREALDB_URL")?;
            config.store = StoreConfig::Surreal { url };
        }
        Some(StoreKind::Local) => {
            let path = cli.db_path.clone().unwrap_or_else(|| match &config.store {
                StoreConfig::Local { path } => path.clone(),
                _ => StoreConfig::default_local_path(),
            });
            config.store = StoreConfig::Local { path };
        }
        None => {}
    }
    Ok(config)
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn StateStore>> {
    let store: Arc<dyn StateStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStateStore::new()),
        StoreConfig::Surreal { url } => Arc::new(SurrealStateStore::connect(url).await?),
        StoreConfig::Local { path } => {
            let path = path
                .to_str()
                .with_context(|| format!("database path {} is not UTF-8", path.display()))?;
            Arc::new(SurrealStateStore::local(path).await?)
        }
    };
    Ok(store)
}

fn load_claim(path: &Path) -> Result<Claim> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read claim file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid claim JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// List registered agents
fn cmd_agents(registry: &AgentRegistry, format: OutputFormat) -> Result<()> {
    let agents = registry.list_agents();
    if format == OutputFormat::Json {
        return print_json(&agents);
    }

    for spec in agents {
        let deps: Vec<&str> = spec.dependencies.iter().map(|d| d.as_str()).collect();
        let deps = if deps.is_empty() {
            "-".to_string()
        } else {
            deps.join(", ")
        };
        println!("{:<16} {:<22} needs: {}", spec.id, spec.name, deps);
    }
    Ok(())
}

/// Claim state plus the agents whose output predates the given snapshot.
#[derive(Serialize)]
struct StateReport<'a> {
    #[serde(flatten)]
    state: &'a OrchestratorState,
    stale: &'a [AgentId],
}

/// Show orchestrator state
async fn cmd_state(
    orchestrator: &Orchestrator,
    claim_id: &str,
    claim: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let state = orchestrator
        .get_state(&ClaimId::new(claim_id))
        .await
        .with_context(|| format!("Failed to load state for claim '{claim_id}'"))?;

    let stale = match claim {
        Some(path) => state.stale_agents(&load_claim(path)?)?,
        None => Vec::new(),
    };

    if format == OutputFormat::Json {
        println!("{}", state_json(&state, &stale)?);
        return Ok(());
    }
    print!("{}", render_state(&state, &stale));
    Ok(())
}

fn state_json(state: &OrchestratorState, stale: &[AgentId]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&StateReport { state, stale })?)
}

fn render_state(state: &OrchestratorState, stale: &[AgentId]) -> String {
    let mut out = format!("claim {}\n", state.claim_id);
    for entry in &state.agents {
        let when = entry.state.updated_at.format("%Y-%m-%d %H:%M:%S UTC");
        let mut line = format!("  {:<16} {:<9} {}", entry.agent_id, entry.state.status, when);
        if let Some(err) = &entry.state.error {
            line.push_str(&format!("  ({err})"));
        }
        if stale.contains(&entry.agent_id) {
            line.push_str("  [stale]");
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Run agents for a claim
async fn cmd_run(
    orchestrator: &Orchestrator,
    claim_path: &Path,
    target: &str,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let claim = load_claim(claim_path)?;
    let target: RunTarget = target
        .parse()
        .with_context(|| format!("Invalid run target '{target}'"))?;
    let request = RunRequest {
        claim_id: claim.id(),
        target,
        force,
    };
    info!(claim_id = %request.claim_id, target = %request.target, force, "starting run");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::AgentStarted { agent_id } = event {
                eprintln!("running {agent_id}...");
            }
        }
    });

    let result = orchestrator
        .run_with_progress(request, &claim, tx)
        .await
        .with_context(|| format!("Run rejected for claim '{}'", claim.claim_id))?;
    printer.await.ok();

    if format == OutputFormat::Json {
        return print_json(&result);
    }
    print!("{}", render_run(&result));
    Ok(())
}

fn render_run(result: &RunResult) -> String {
    let status = match result.status {
        claimflow_core::RunStatus::Completed => "completed",
        claimflow_core::RunStatus::PartiallyFailed => "partially failed",
    };
    let mut out = format!(
        "run {} for claim {}: {} in {}ms\n",
        result.run_id, result.claim_id, status, result.duration_ms
    );

    for t in &result.transitions {
        let note = match &t.detail {
            TransitionDetail::Output { .. } => String::new(),
            TransitionDetail::Failure { failure } => format!("  {failure}"),
            TransitionDetail::AlreadyComplete => "  (already complete)".to_string(),
            TransitionDetail::BlockedBy { agent } => format!("  (blocked by {agent})"),
            TransitionDetail::Invalidated { by } => format!("  (invalidated by {by})"),
        };
        let arrow = if t.from == t.to && t.to != AgentStatus::Complete {
            format!("{}", t.to)
        } else {
            format!("{} -> {}", t.from, t.to)
        };
        out.push_str(&format!("  {:<16} {}{}\n", t.agent_id, arrow, note));
    }

    if !result.actions.is_empty() {
        out.push_str("proposed actions:\n");
        for action in &result.actions {
            out.push_str(&format!("  - {}\n", describe_action(action)));
        }
    }
    out
}

fn describe_action(action: &ClaimAction) -> String {
    match action {
        ClaimAction::UpdateClaimStatus { status, reason } => {
            format!("set claim status to {status:?} ({reason})")
        }
        ClaimAction::RecordPayoutEstimate {
            damage_total,
            payout,
            confidence,
        } => format!(
            "record estimate ${damage_total}, payout ${payout} ({confidence:?} confidence)"
        ),
        ClaimAction::AttachDraft {
            document_digest, ..
        } => format!("attach draft {}", document_digest.short()),
        ClaimAction::RequestMissingFields { fields } => {
            format!("request missing fields: {}", fields.join(", "))
        }
        ClaimAction::NotifyUser { message } => format!("notify: {message}"),
    }
}

/// List claims with stored state
async fn cmd_claims(store: &dyn StateStore, format: OutputFormat) -> Result<()> {
    let claims = store
        .list_claims()
        .await
        .context("Failed to list claims")?;

    if format == OutputFormat::Json {
        return print_json(&claims);
    }
    if claims.is_empty() {
        println!("No claims with stored state.");
    }
    for claim in claims {
        println!("{claim}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimflow_core::RunStatus;

    fn write_claim(dir: &Path) -> PathBuf {
        let path = dir.join("claim.json");
        let claim = serde_json::json!({
            "claim_id": "CLM-CLI-1",
            "claimant_name": "Dana Whitfield",
            "incident_data": {
                "date": "2024-03-02", "time": "08:15",
                "location": "Route 1 & Alexander Rd, Princeton, NJ",
                "type": "side impact",
                "description": "Hit on the passenger side at an intersection."
            },
            "vehicle_data": {
                "year": 2021, "make": "Toyota", "model": "Camry", "license_plate": "NJ-77Q2"
            },
            "insurance_data": {
                "provider": "Garden State Mutual", "policy_number": "GSM-220-4410",
                "coverage_type": "collision", "deductible": 500
            },
            "damage_data": {
                "description": "Passenger doors dented, mirror broken.",
                "severity": "moderate",
                "photos_uploaded": true
            },
            "documents_uploaded": true,
            "created_at": "2024-03-02T09:00:00Z",
            "updated_at": "2024-03-02T09:00:00Z"
        });
        std::fs::write(&path, serde_json::to_vec_pretty(&claim).unwrap()).unwrap();
        path
    }

    fn memory_orchestrator() -> Orchestrator {
        Orchestrator::new(
            builtin_registry().unwrap(),
            Arc::new(MemoryStateStore::new()),
            &OrchestratorConfig::default(),
        )
    }

    #[test]
    fn test_cli_parses_run_with_flags() {
        let cli = Cli::try_parse_from([
            "claimflow", "--store", "memory", "run", "claim.json", "--target", "fintrack",
            "--force",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(StoreKind::Memory));
        match cli.command {
            Commands::Run {
                claim,
                target,
                force,
            } => {
                assert_eq!(claim, PathBuf::from("claim.json"));
                assert_eq!(target, "fintrack");
                assert!(force);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_store_flag_overrides_config() {
        let cli = Cli::try_parse_from([
            "claimflow", "--store", "local", "--db-path", "/tmp/claims", "claims",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Local {
                path: PathBuf::from("/tmp/claims")
            }
        );
    }

    #[test]
    fn test_load_claim_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_claim(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid claim JSON"));
    }

    #[tokio::test]
    async fn test_run_then_state_over_memory_store() {
        let dir = tempfile::tempdir().unwrap();
        let claim = load_claim(&write_claim(dir.path())).unwrap();
        let orchestrator = memory_orchestrator();

        let request = RunRequest::agent(claim.id(), "core_agent").unwrap();
        let result = orchestrator.run(request, &claim).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);

        let rendered = render_run(&result);
        assert!(rendered.contains("core_agent"));
        assert!(rendered.contains("idle -> complete"));

        let state = orchestrator.get_state(&claim.id()).await.unwrap();
        let text = render_state(&state, &[]);
        assert!(text.starts_with("claim CLM-CLI-1\n"));
        assert!(text.contains("fintrack"));
        assert_eq!(text.lines().count(), 6);
    }

    #[test]
    fn test_only_agents_skips_the_store() {
        let agents = Cli::try_parse_from(["claimflow", "agents"]).unwrap();
        assert!(!agents.command.uses_store());
        let claims = Cli::try_parse_from(["claimflow", "claims"]).unwrap();
        assert!(claims.command.uses_store());
    }

    #[tokio::test]
    async fn test_state_json_carries_stale_agents() {
        let dir = tempfile::tempdir().unwrap();
        let mut claim = load_claim(&write_claim(dir.path())).unwrap();
        let orchestrator = memory_orchestrator();
        let request = RunRequest::agent(claim.id(), "core_agent").unwrap();
        orchestrator.run(request, &claim).await.unwrap();

        claim.damage_data.description = "Passenger doors dented, mirror and window broken.".into();
        let state = orchestrator.get_state(&claim.id()).await.unwrap();
        let stale = state.stale_agents(&claim).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&state_json(&state, &stale).unwrap()).unwrap();
        assert_eq!(json["claim_id"], "CLM-CLI-1");
        assert_eq!(json["stale"], serde_json::json!(["core_agent"]));
        assert_eq!(json["agents"].as_array().unwrap().len(), 5);
        assert!(render_state(&state, &stale).contains("[stale]"));
    }

    #[tokio::test]
    async fn test_cmd_run_rejects_unknown_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_claim(dir.path());
        let orchestrator = memory_orchestrator();

        let err = cmd_run(&orchestrator, &path, "appraiser", false, OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Run rejected"));
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::Memory).await.unwrap();
        assert!(store.list_claims().await.unwrap().is_empty());
    }
}
