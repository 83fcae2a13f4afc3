//! Damage and payout estimation.

use async_trait::async_trait;

use crate::domain::output::{CostBreakdown, EstimateConfidence, FinTrackOutput};
use crate::domain::{AgentFailure, AgentOutput, Claim, DamageSeverity};
use crate::executor::{AgentContext, AgentHandler};

/// Applied when the policy carries no deductible.
pub const DEFAULT_DEDUCTIBLE: u32 = 500;

const SEVERE_KEYWORDS: &[&str] = &[
    "totaled",
    "frame",
    "structural",
    "airbag",
    "major",
    "extensive",
    "severe",
];
const MINOR_KEYWORDS: &[&str] = &["scratch", "dent", "minor", "small", "cosmetic", "paint"];

pub struct FinTrackAgent;

#[async_trait]
impl AgentHandler for FinTrackAgent {
    async fn handle(&self, ctx: AgentContext) -> Result<AgentOutput, AgentFailure> {
        if ctx.claim.damage_data.description.trim().is_empty() {
            return Err(AgentFailure::domain(
                "damage description is required for an estimate",
            ));
        }
        Ok(AgentOutput::FinTrack(estimate(&ctx.claim)))
    }
}

/// Infer severity from free text when the claimant did not grade it.
pub fn detect_severity(description: &str) -> DamageSeverity {
    let lower = description.to_lowercase();
    if SEVERE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        DamageSeverity::Severe
    } else if MINOR_KEYWORDS.iter().any(|kw| lower.contains(kw)) && !lower.contains("multiple") {
        DamageSeverity::Minor
    } else {
        DamageSeverity::Moderate
    }
}

fn base_range(severity: DamageSeverity) -> (u32, u32) {
    match severity {
        DamageSeverity::Minor => (800, 1500),
        DamageSeverity::Moderate => (1500, 4000),
        DamageSeverity::Severe => (4000, 8000),
    }
}

fn damage_multiplier(description: &str) -> f64 {
    let lower = description.to_lowercase();
    let mut multiplier = 1.0;
    if lower.contains("frame") || lower.contains("structural") {
        multiplier += 0.5;
    }
    if lower.contains("airbag") {
        multiplier += 0.3;
    }
    if lower.contains("multiple") || lower.contains("several") {
        multiplier += 0.2;
    }
    multiplier
}

fn share(total: u32, fraction: f64) -> u32 {
    (total as f64 * fraction).round() as u32
}

pub fn estimate(claim: &Claim) -> FinTrackOutput {
    let damage = &claim.damage_data;
    let severity = damage
        .severity
        .unwrap_or_else(|| detect_severity(&damage.description));

    let (min, max) = base_range(severity);
    let base = (min + max) as f64 / 2.0;
    let multiplier = damage_multiplier(&damage.description);
    let damage_total = (base * multiplier).round() as u32;

    let deductible = match claim.insurance_data.deductible {
        0 => DEFAULT_DEDUCTIBLE,
        d => d,
    };
    let payout = damage_total.saturating_sub(deductible);

    let confidence = if damage.photos_uploaded {
        EstimateConfidence::High
    } else if damage.severity.is_none() {
        EstimateConfidence::Low
    } else {
        EstimateConfidence::Medium
    };

    let mut notes = Vec::new();
    if !damage.photos_uploaded {
        notes.push("Upload photos for more accurate estimate".to_string());
    }
    if severity == DamageSeverity::Severe {
        notes.push("Professional inspection recommended".to_string());
    }
    if multiplier > 1.3 {
        notes.push(
            "Significant damage detected - estimate may increase with inspection".to_string(),
        );
    }

    FinTrackOutput {
        damage_total,
        deductible,
        payout,
        severity,
        confidence,
        breakdown: CostBreakdown {
            parts: share(damage_total, 0.5),
            labor: share(damage_total, 0.35),
            paint: share(damage_total, 0.1),
            other: share(damage_total, 0.05),
        },
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::claim::fixtures::sample_claim;

    #[test]
    fn test_severity_keywords() {
        assert_eq!(detect_severity("Frame bent after impact"), DamageSeverity::Severe);
        assert_eq!(detect_severity("small scratch on door"), DamageSeverity::Minor);
        assert_eq!(
            detect_severity("multiple dents along the side"),
            DamageSeverity::Moderate
        );
        assert_eq!(detect_severity("bumper pushed in"), DamageSeverity::Moderate);
    }

    #[test]
    fn test_moderate_estimate_with_photos() {
        let out = estimate(&sample_claim());
        assert_eq!(out.damage_total, 2750);
        assert_eq!(out.deductible, 500);
        assert_eq!(out.payout, 2250);
        assert_eq!(out.confidence, EstimateConfidence::High);
        assert_eq!(
            out.breakdown,
            CostBreakdown {
                parts: 1375,
                labor: 962,
                paint: 275,
                other: 138,
            }
        );
        assert!(out.notes.is_empty());
    }

    #[test]
    fn test_severe_structural_damage_without_photos() {
        let mut claim = sample_claim();
        claim.damage_data.severity = None;
        claim.damage_data.photos_uploaded = false;
        claim.damage_data.description = "Structural damage and airbag deployed".to_string();
        claim.insurance_data.deductible = 1000;

        let out = estimate(&claim);
        assert_eq!(out.severity, DamageSeverity::Severe);
        // 6000 midpoint * (1 + 0.5 + 0.3)
        assert_eq!(out.damage_total, 10800);
        assert_eq!(out.payout, 9800);
        assert_eq!(out.confidence, EstimateConfidence::Low);
        assert_eq!(out.notes.len(), 3);
    }

    #[test]
    fn test_payout_never_negative_and_default_deductible() {
        let mut claim = sample_claim();
        claim.damage_data.severity = Some(DamageSeverity::Minor);
        claim.damage_data.description = "Light scuff".to_string();
        claim.insurance_data.deductible = 2000;
        assert_eq!(estimate(&claim).payout, 0);

        claim.insurance_data.deductible = 0;
        let out = estimate(&claim);
        assert_eq!(out.deductible, DEFAULT_DEDUCTIBLE);
        assert_eq!(out.payout, 1150 - 500);
    }
}
