//! Compliance and submission validation.

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use regex::Regex;

use crate::domain::agent::DRAFTING;
use crate::domain::output::{CheckSeverity, ComplianceCheck, ComplianceOutput};
use crate::domain::{AgentFailure, AgentOutput, Claim};
use crate::executor::{AgentContext, AgentHandler};

const MIN_DESCRIPTION_CHARS: usize = 20;
const MIN_LOCATION_CHARS: usize = 5;

/// Patterns for personal data that must not appear in a submitted draft.
pub struct PiiScanner {
    patterns: Vec<(&'static str, Regex)>,
}

impl PiiScanner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                ("SSN", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b")?),
                ("card number", Regex::new(r"\b(?:\d[ -]?){12,15}\d\b")?),
                (
                    "email address",
                    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
                ),
            ],
        })
    }

    /// Kinds of personal data found in `text`, in pattern order.
    pub fn scan(&self, text: &str) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(kind, _)| kind.to_string())
            .collect()
    }
}

pub struct ComplianceAgent {
    pii: PiiScanner,
}

impl ComplianceAgent {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pii: PiiScanner::new()?,
        })
    }
}

#[async_trait]
impl AgentHandler for ComplianceAgent {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        let draft = ctx
            .prior_output(DRAFTING)
            .and_then(AgentOutput::as_drafting)
            .map(|d| d.document_text.as_str());
        let today = chrono::Utc::now().date_naive();
        Ok(AgentOutput::Compliance(validate(
            &ctx.claim, draft, &self.pii, today,
        )))
    }
}

/// Within the past year and not in the future, relative to `today`.
fn is_reasonable_date(date: &str, today: NaiveDate) -> bool {
    let Ok(date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
        return false;
    };
    let earliest = today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN);
    date <= today && date >= earliest
}

fn check(field: &str, required: bool, passed: bool, ok: &str, failed: &str) -> ComplianceCheck {
    let severity = match (passed, required) {
        (true, _) => CheckSeverity::Info,
        (false, true) => CheckSeverity::Error,
        (false, false) => CheckSeverity::Warning,
    };
    ComplianceCheck {
        field: field.to_string(),
        required,
        passed,
        message: if passed { ok } else { failed }.to_string(),
        severity,
    }
}

fn next_steps(ready: bool, missing: &[String], warnings: &[String], pii: &[String]) -> Vec<String> {
    if ready && pii.is_empty() {
        return vec![
            "Review all claim details for accuracy".to_string(),
            "Submit claim to insurance provider".to_string(),
            "Save confirmation number for your records".to_string(),
        ];
    }

    let mut steps: Vec<String> = missing
        .iter()
        .filter_map(|field| match field.as_str() {
            "policy_number" => Some("Add your insurance policy number"),
            "incident_date" => Some("Provide the date of the incident"),
            "location" => Some("Enter the detailed location of the incident"),
            "damage_description" => Some("Provide a detailed description of the damage"),
            "document_upload" => Some("Upload supporting documents (police report, photos)"),
            "claimant_name" => Some("Provide your full name"),
            _ => None,
        })
        .map(str::to_string)
        .collect();

    if !pii.is_empty() {
        steps.push(format!(
            "Remove personal identifiers from the claim draft ({})",
            pii.join(", ")
        ));
    }
    if !warnings.is_empty() {
        steps.push(
            "Consider adding vehicle VIN or license plate for faster processing".to_string(),
        );
    }
    steps
}

/// Check the claim for completeness and, when a draft is given, scan it for
/// personal data.
pub fn validate(
    claim: &Claim,
    draft: Option<&str>,
    pii: &PiiScanner,
    today: NaiveDate,
) -> ComplianceOutput {
    let incident = &claim.incident_data;
    let description_len = claim.damage_data.description.trim().chars().count();
    let claimant = claim
        .claimant_name
        .as_deref()
        .is_some_and(|n| !n.trim().is_empty());

    let mut checks = vec![
        check(
            "policy_number",
            true,
            !claim.insurance_data.policy_number.trim().is_empty(),
            "Policy number provided",
            "Policy number is required for claim submission",
        ),
        check(
            "incident_date",
            true,
            is_reasonable_date(&incident.date, today),
            "Incident date provided",
            "Valid incident date within the past year is required",
        ),
        check(
            "location",
            true,
            incident.location.trim().chars().count() > MIN_LOCATION_CHARS,
            "Incident location provided",
            "Detailed location is required (street address preferred)",
        ),
        check(
            "damage_description",
            true,
            description_len >= MIN_DESCRIPTION_CHARS,
            &format!("Damage description provided ({description_len} characters)"),
            &format!("Damage description must be at least {MIN_DESCRIPTION_CHARS} characters"),
        ),
        check(
            "document_upload",
            true,
            claim.documents_uploaded,
            "Supporting documents uploaded",
            "Please upload police report or incident documentation",
        ),
        check(
            "claimant_name",
            true,
            claimant,
            "Claimant name provided",
            "Claimant name is required",
        ),
        check(
            "vehicle_identification",
            false,
            claim.vehicle_data.vin.as_deref().is_some_and(|v| !v.is_empty())
                || !claim.vehicle_data.license_plate.trim().is_empty(),
            "Vehicle identification provided",
            "VIN or license plate recommended for faster processing",
        ),
    ];
    if !claim.insurance_data.provider.trim().is_empty() {
        checks.push(check(
            "insurance_provider",
            false,
            true,
            "Insurance provider information included",
            "",
        ));
    }

    let pii_findings = draft.map(|text| pii.scan(text)).unwrap_or_default();
    if !pii_findings.is_empty() {
        checks.push(check(
            "pii_redaction",
            false,
            false,
            "",
            &format!("Draft contains {}", pii_findings.join(", ")),
        ));
    }

    let required: Vec<&ComplianceCheck> = checks.iter().filter(|c| c.required).collect();
    let passed_required = required.iter().filter(|c| c.passed).count();
    let all_checks_passed = passed_required == required.len();
    let missing_fields: Vec<String> = required
        .iter()
        .filter(|c| !c.passed)
        .map(|c| c.field.clone())
        .collect();
    let warnings: Vec<String> = checks
        .iter()
        .filter(|c| c.severity == CheckSeverity::Warning && c.field != "pii_redaction")
        .map(|c| c.message.clone())
        .collect();
    let completion_percentage =
        ((passed_required as f64 / required.len() as f64) * 100.0).round() as u8;
    let ready_to_submit = all_checks_passed && pii_findings.is_empty();

    ComplianceOutput {
        next_steps: next_steps(all_checks_passed, &missing_fields, &warnings, &pii_findings),
        all_checks_passed,
        ready_to_submit,
        checks,
        missing_fields,
        warnings,
        pii_findings,
        completion_percentage,
    }
}
