//! Typed follow-up actions proposed to the surrounding application.
//!
//! The orchestrator never mutates a [`Claim`]. After a run it derives
//! `ClaimAction` messages from what the agents produced; the caller decides
//! whether to apply them.

use claimflow_state::ContentDigest;
use serde::{Deserialize, Serialize};

use crate::domain::output::EstimateConfidence;
use crate::domain::{AgentOutput, Claim, ClaimStatus, Transition, TransitionDetail};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClaimAction {
    UpdateClaimStatus {
        status: ClaimStatus,
        reason: String,
    },
    RecordPayoutEstimate {
        damage_total: u32,
        payout: u32,
        confidence: EstimateConfidence,
    },
    AttachDraft {
        document_digest: ContentDigest,
        preview: String,
    },
    RequestMissingFields {
        fields: Vec<String>,
    },
    NotifyUser {
        message: String,
    },
}

/// Derive follow-up actions from one run's transitions, in transition order.
pub fn derive_actions(claim: &Claim, transitions: &[Transition]) -> Vec<ClaimAction> {
    let mut actions = Vec::new();
    let mut executed_any = false;
    let mut ready_to_submit = false;

    for transition in transitions {
        match &transition.detail {
            TransitionDetail::Output { output } => {
                executed_any = true;
                match output {
                    AgentOutput::CoreAgent(core) if !core.missing_fields.is_empty() => {
                        actions.push(ClaimAction::RequestMissingFields {
                            fields: core.missing_fields.clone(),
                        });
                    }
                    AgentOutput::FinTrack(estimate) => {
                        actions.push(ClaimAction::RecordPayoutEstimate {
                            damage_total: estimate.damage_total,
                            payout: estimate.payout,
                            confidence: estimate.confidence,
                        });
                        actions.push(ClaimAction::NotifyUser {
                            message: format!(
                                "Estimated payout ${} (damage ${} less ${} deductible)",
                                estimate.payout, estimate.damage_total, estimate.deductible
                            ),
                        });
                    }
                    AgentOutput::RepairAdvisor(advice) if !advice.shops.is_empty() => {
                        actions.push(ClaimAction::NotifyUser {
                            message: format!(
                                "Found {} repair shops near {}",
                                advice.shops.len(),
                                advice.search_location
                            ),
                        });
                    }
                    AgentOutput::Drafting(draft) => {
                        actions.push(ClaimAction::AttachDraft {
                            document_digest: draft.document_digest.clone(),
                            preview: draft.preview_text.clone(),
                        });
                    }
                    AgentOutput::Compliance(report) => {
                        ready_to_submit = report.ready_to_submit;
                        if !report.missing_fields.is_empty() {
                            actions.push(ClaimAction::RequestMissingFields {
                                fields: report.missing_fields.clone(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            TransitionDetail::Failure { failure } => {
                executed_any = true;
                actions.push(ClaimAction::NotifyUser {
                    message: format!("{} failed: {}", transition.agent_id, failure.message),
                });
            }
            _ => {}
        }
    }

    let early = matches!(claim.status, ClaimStatus::Draft | ClaimStatus::Processing);
    if ready_to_submit && early {
        actions.push(ClaimAction::UpdateClaimStatus {
            status: ClaimStatus::Review,
            reason: "compliance checks passed".to_string(),
        });
    } else if executed_any && claim.status == ClaimStatus::Draft {
        actions.push(ClaimAction::UpdateClaimStatus {
            status: ClaimStatus::Processing,
            reason: "analysis started".to_string(),
        });
    }

    actions
}
