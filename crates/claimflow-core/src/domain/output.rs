//! Typed agent outputs and failures.
//!
//! Each built-in agent has its own output schema; [`AgentOutput`] is the
//! discriminated union over them, keyed by the producing agent. Injected
//! third-party agents use [`AgentOutput::Opaque`].

use chrono::{DateTime, Utc};
use claimflow_state::ContentDigest;
use serde::{Deserialize, Serialize};

use super::agent::{COMPLIANCE, CORE_AGENT, DRAFTING, FINTRACK, REPAIR_ADVISOR};
use super::claim::{CoverageType, DamageSeverity};

// ---------------------------------------------------------------------------
// core_agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub date: String,
    pub time: String,
    pub location: String,
    pub incident_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub role: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageAssessment {
    pub description: String,
    pub severity: Option<DamageSeverity>,
    pub photos_uploaded: bool,
    pub vehicle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDetails {
    pub provider: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub deductible: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub incident_info: IncidentSummary,
    pub parties: Vec<Party>,
    pub damage_assessment: DamageAssessment,
    pub policy_details: PolicyDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreAgentOutput {
    pub extracted_data: ExtractedData,
    /// Share of expected fields that were present, in `[0, 1]`.
    pub confidence: f64,
    pub missing_fields: Vec<String>,
    pub processing_time_ms: u64,
}

// ---------------------------------------------------------------------------
// fintrack
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateConfidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub parts: u32,
    pub labor: u32,
    pub paint: u32,
    pub other: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinTrackOutput {
    pub damage_total: u32,
    pub deductible: u32,
    pub payout: u32,
    pub severity: DamageSeverity,
    pub confidence: EstimateConfidence,
    pub breakdown: CostBreakdown,
    pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// repair_advisor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Standard,
    #[serde(rename = "$$$")]
    Premium,
}

impl PriceRange {
    /// Multiplier applied to a base repair estimate for shops in this range.
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            PriceRange::Budget => 0.85,
            PriceRange::Standard => 1.0,
            PriceRange::Premium => 1.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairShop {
    pub id: String,
    pub name: String,
    pub specialty: Vec<String>,
    pub address: String,
    pub phone: String,
    pub rating: f64,
    pub reviews_count: u32,
    pub price_range: PriceRange,
    pub estimated_cost: u32,
    pub turnaround_days: u32,
    pub distance_miles: f64,
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairAdvisorOutput {
    pub shops: Vec<RepairShop>,
    pub total_found: usize,
    pub search_location: String,
    pub recommendation: Option<String>,
}

// ---------------------------------------------------------------------------
// drafting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftingOutput {
    pub document_text: String,
    pub preview_text: String,
    /// SHA-256 of `document_text`.
    pub document_digest: ContentDigest,
    pub generated_at: DateTime<Utc>,
    pub ready_for_submission: bool,
}

// ---------------------------------------------------------------------------
// compliance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceCheck {
    pub field: String,
    pub required: bool,
    pub passed: bool,
    pub message: String,
    pub severity: CheckSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceOutput {
    pub all_checks_passed: bool,
    pub ready_to_submit: bool,
    pub checks: Vec<ComplianceCheck>,
    pub missing_fields: Vec<String>,
    pub warnings: Vec<String>,
    /// Kinds of personal data found in the draft (e.g. `SSN`).
    pub pii_findings: Vec<String>,
    pub completion_percentage: u8,
    pub next_steps: Vec<String>,
}

// ---------------------------------------------------------------------------
// AgentOutput / Outcome
// ---------------------------------------------------------------------------

/// Output of one successful agent execution.
///
/// The `kind` tag names the producing agent, so a stored output can be
/// checked against the agent it is recorded under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AgentOutput {
    CoreAgent(CoreAgentOutput),
    #[serde(rename = "fintrack")]
    FinTrack(FinTrackOutput),
    RepairAdvisor(RepairAdvisorOutput),
    Drafting(DraftingOutput),
    Compliance(ComplianceOutput),
    /// Output of an injected agent with no built-in schema.
    Opaque(serde_json::Value),
}

impl AgentOutput {
    /// The built-in agent that produces this variant, if any.
    pub fn producing_agent(&self) -> Option<&'static str> {
        match self {
            AgentOutput::CoreAgent(_) => Some(CORE_AGENT),
            AgentOutput::FinTrack(_) => Some(FINTRACK),
            AgentOutput::RepairAdvisor(_) => Some(REPAIR_ADVISOR),
            AgentOutput::Drafting(_) => Some(DRAFTING),
            AgentOutput::Compliance(_) => Some(COMPLIANCE),
            AgentOutput::Opaque(_) => None,
        }
    }

    pub fn as_fintrack(&self) -> Option<&FinTrackOutput> {
        match self {
            AgentOutput::FinTrack(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_drafting(&self) -> Option<&DraftingOutput> {
        match self {
            AgentOutput::Drafting(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_compliance(&self) -> Option<&ComplianceOutput> {
        match self {
            AgentOutput::Compliance(o) => Some(o),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The domain function reported an error.
    Domain,
    /// The domain function returned data that does not fit its agent.
    InvalidOutput,
    /// The call exceeded the configured agent timeout.
    Timeout,
    /// The domain function panicked.
    Panicked,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Domain => "domain",
            FailureKind::InvalidOutput => "invalid_output",
            FailureKind::Timeout => "timeout",
            FailureKind::Panicked => "panicked",
        }
    }

    /// Parse a stored kind; unrecognised values are treated as domain failures.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "invalid_output" => FailureKind::InvalidOutput,
            "timeout" => FailureKind::Timeout,
            "panicked" => FailureKind::Panicked,
            _ => FailureKind::Domain,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured agent failure. Reported as data, never raised to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct AgentFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl AgentFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Domain, message)
    }
}

/// Normalised result of one agent execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(AgentOutput),
    Failure(AgentFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}
