//! Document extraction: structures the raw claim for downstream agents.

use std::time::Instant;

use async_trait::async_trait;

use crate::domain::output::{
    CoreAgentOutput, DamageAssessment, ExtractedData, IncidentSummary, Party, PolicyDetails,
};
use crate::domain::{AgentFailure, AgentOutput, Claim, IncidentType};
use crate::executor::{AgentContext, AgentHandler};

pub struct CoreAgent;

#[async_trait]
impl AgentHandler for CoreAgent {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        Ok(AgentOutput::CoreAgent(extract(&ctx.claim)))
    }
}

fn parties(claim: &Claim) -> Vec<Party> {
    let mut parties = Vec::new();
    if let Some(name) = claim.claimant_name.as_deref().filter(|n| !n.trim().is_empty()) {
        parties.push(Party {
            name: name.to_string(),
            role: "claimant".to_string(),
            contact: None,
        });
    }
    if let Some(report) = &claim.police_report {
        if let Some(officer) = &report.officer_name {
            parties.push(Party {
                name: officer.clone(),
                role: "police officer".to_string(),
                contact: report.report_number.as_ref().map(|n| format!("report {n}")),
            });
        }
        if let Some(witness) = &report.witness_info {
            parties.push(Party {
                name: witness.clone(),
                role: "witness".to_string(),
                contact: None,
            });
        }
    }
    parties
}

/// Structure the claim into `extracted_data` and score its completeness.
///
/// Six signals count toward confidence: a specific incident type, a date, a
/// location, at least one named party, a damage description and a
/// deductible amount.
pub fn extract(claim: &Claim) -> CoreAgentOutput {
    let started = Instant::now();
    let incident = &claim.incident_data;
    let parties = parties(claim);

    let checks = [
        ("incident_type", incident.incident_type != IncidentType::Other),
        ("incident_date", !incident.date.trim().is_empty()),
        (
            "location",
            !incident.location.trim().is_empty()
                && !incident.location.to_lowercase().contains("not specified"),
        ),
        ("parties", !parties.is_empty()),
        (
            "damage_description",
            !claim.damage_data.description.trim().is_empty(),
        ),
        ("deductible", claim.insurance_data.deductible > 0),
    ];
    let passed = checks.iter().filter(|(_, ok)| *ok).count();
    let confidence = ((passed as f64 / checks.len() as f64) * 100.0).round() / 100.0;
    let missing_fields = checks
        .iter()
        .filter(|(_, ok)| !*ok)
        .map(|(field, _)| field.to_string())
        .collect();

    let extracted_data = ExtractedData {
        incident_info: IncidentSummary {
            date: incident.date.clone(),
            time: incident.time.clone(),
            location: incident.location.clone(),
            incident_type: incident.incident_type.label().to_string(),
            description: incident.description.clone(),
        },
        parties,
        damage_assessment: DamageAssessment {
            description: claim.damage_data.description.clone(),
            severity: claim.damage_data.severity,
            photos_uploaded: claim.damage_data.photos_uploaded,
            vehicle: claim.vehicle_label(),
        },
        policy_details: PolicyDetails {
            provider: claim.insurance_data.provider.clone(),
            policy_number: claim.insurance_data.policy_number.clone(),
            coverage_type: claim.insurance_data.coverage_type,
            deductible: claim.insurance_data.deductible,
        },
    };

    CoreAgentOutput {
        extracted_data,
        confidence,
        missing_fields,
        processing_time_ms: started.elapsed().as_millis() as u64,
    }
}
