//! Claim document drafting.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use claimflow_state::ContentDigest;

use crate::domain::agent::FINTRACK;
use crate::domain::output::{DraftingOutput, FinTrackOutput};
use crate::domain::{AgentFailure, AgentOutput, Claim};
use crate::executor::{AgentContext, AgentHandler};

const PREVIEW_CHARS: usize = 280;

pub struct DraftingAgent;

#[async_trait]
impl AgentHandler for DraftingAgent {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        let estimate = ctx.prior_output(FINTRACK).and_then(AgentOutput::as_fintrack);
        let draft = draft(&ctx.claim, estimate, Utc::now())
            .map_err(|e| AgentFailure::domain(format!("rendering draft: {e}")))?;
        Ok(AgentOutput::Drafting(draft))
    }
}

fn render(
    claim: &Claim,
    estimate: Option<&FinTrackOutput>,
    generated_at: DateTime<Utc>,
) -> Result<String, std::fmt::Error> {
    let mut doc = String::new();
    let incident = &claim.incident_data;
    let vehicle = &claim.vehicle_data;
    let insurance = &claim.insurance_data;

    writeln!(doc, "INSURANCE CLAIM SUBMISSION")?;
    writeln!(doc, "Claim ID: {}", claim.claim_id)?;
    if let Some(name) = &claim.claimant_name {
        writeln!(doc, "Claimant: {name}")?;
    }
    writeln!(doc, "Generated: {}", generated_at.format("%B %d, %Y at %H:%M UTC"))?;

    writeln!(doc, "\nINCIDENT INFORMATION")?;
    writeln!(doc, "Incident Type: {}", incident.incident_type.label())?;
    writeln!(doc, "Date of Incident: {} {}", incident.date, incident.time)?;
    writeln!(doc, "Location: {}", incident.location)?;
    writeln!(doc, "Description: {}", incident.description)?;

    writeln!(doc, "\nVEHICLE")?;
    writeln!(doc, "Vehicle: {}", claim.vehicle_label())?;
    writeln!(doc, "License Plate: {}", vehicle.license_plate)?;
    if let Some(vin) = &vehicle.vin {
        writeln!(doc, "VIN: {vin}")?;
    }

    writeln!(doc, "\nINSURANCE")?;
    writeln!(doc, "Provider: {}", insurance.provider)?;
    writeln!(doc, "Policy Number: {}", insurance.policy_number)?;
    writeln!(doc, "Coverage: {:?}", insurance.coverage_type)?;
    writeln!(doc, "Deductible: ${}", insurance.deductible)?;

    writeln!(doc, "\nDAMAGE DESCRIPTION")?;
    writeln!(doc, "{}", claim.damage_data.description)?;
    if let Some(severity) = claim.damage_data.severity {
        writeln!(doc, "Reported Severity: {severity:?}")?;
    }

    if let Some(report) = &claim.police_report {
        writeln!(doc, "\nPOLICE REPORT")?;
        writeln!(doc, "Filed: {}", if report.filed { "yes" } else { "no" })?;
        if let Some(number) = &report.report_number {
            writeln!(doc, "Report Number: {number}")?;
        }
        if let Some(officer) = &report.officer_name {
            writeln!(doc, "Officer: {officer}")?;
        }
        if let Some(witness) = &report.witness_info {
            writeln!(doc, "Witness: {witness}")?;
        }
    }

    if let Some(estimate) = estimate {
        writeln!(doc, "\nFINANCIAL ESTIMATE")?;
        writeln!(doc, "Total Estimated Damage: ${}", estimate.damage_total)?;
        writeln!(doc, "Deductible (Your Cost): ${}", estimate.deductible)?;
        writeln!(doc, "Insurance Payout: ${}", estimate.payout)?;
        let b = &estimate.breakdown;
        writeln!(
            doc,
            "Breakdown: parts ${}, labor ${}, paint ${}, other ${}",
            b.parts, b.labor, b.paint, b.other
        )?;
    }

    writeln!(doc, "\nDocument ID: {}", claim.claim_id)?;
    Ok(doc)
}

/// Render the claim document. `estimate` adds the financial section.
pub fn draft(
    claim: &Claim,
    estimate: Option<&FinTrackOutput>,
    generated_at: DateTime<Utc>,
) -> Result<DraftingOutput, std::fmt::Error> {
    let document_text = render(claim, estimate, generated_at)?;
    let preview_text: String = document_text.chars().take(PREVIEW_CHARS).collect();
    Ok(DraftingOutput {
        document_digest: ContentDigest::from_bytes(document_text.as_bytes()),
        preview_text,
        document_text,
        generated_at,
        ready_for_submission: estimate.is_some(),
    })
}
