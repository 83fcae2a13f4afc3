//! Claim record supplied by the surrounding application.
//!
//! The orchestrator treats these fields as read-only input. Proposed changes
//! are emitted as [`crate::actions::ClaimAction`] messages instead.

use chrono::{DateTime, Utc};
use claimflow_state::{ClaimId, ContentDigest};
use serde::{Deserialize, Serialize};

use super::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    #[default]
    Draft,
    Processing,
    Review,
    Approved,
    Rejected,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentType {
    #[serde(rename = "rear-end collision")]
    RearEndCollision,
    #[serde(rename = "side impact")]
    SideImpact,
    #[serde(rename = "hit-and-run")]
    HitAndRun,
    #[serde(rename = "parking lot")]
    ParkingLot,
    #[serde(rename = "other")]
    Other,
}

impl IncidentType {
    pub fn label(&self) -> &'static str {
        match self {
            IncidentType::RearEndCollision => "rear-end collision",
            IncidentType::SideImpact => "side impact",
            IncidentType::HitAndRun => "hit-and-run",
            IncidentType::ParkingLot => "parking lot",
            IncidentType::Other => "other",
        }
    }

    /// Whether the incident involved a collision with another vehicle.
    pub fn is_collision(&self) -> bool {
        matches!(
            self,
            IncidentType::RearEndCollision | IncidentType::SideImpact | IncidentType::HitAndRun
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    Comprehensive,
    Collision,
    Liability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSeverity {
    Minor,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentData {
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub time: String,
    pub location: String,
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleData {
    pub year: u16,
    pub make: String,
    pub model: String,
    pub license_plate: String,
    #[serde(default)]
    pub vin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceData {
    pub provider: String,
    pub policy_number: String,
    pub coverage_type: CoverageType,
    pub deductible: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageData {
    pub description: String,
    /// Absent when the claimant did not grade the damage; estimators infer it.
    #[serde(default)]
    pub severity: Option<DamageSeverity>,
    #[serde(default)]
    pub photos_uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoliceReportData {
    pub filed: bool,
    #[serde(default)]
    pub report_number: Option<String>,
    #[serde(default)]
    pub officer_name: Option<String>,
    #[serde(default)]
    pub witness_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub claimant_name: Option<String>,
    #[serde(default)]
    pub status: ClaimStatus,
    pub incident_data: IncidentData,
    pub vehicle_data: VehicleData,
    pub insurance_data: InsuranceData,
    pub damage_data: DamageData,
    #[serde(default)]
    pub police_report: Option<PoliceReportData>,
    /// Supporting documents (police report, photos, forms) are attached.
    #[serde(default)]
    pub documents_uploaded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    pub fn id(&self) -> ClaimId {
        ClaimId::new(self.claim_id.clone())
    }

    /// Digest of the claim's analysable content.
    ///
    /// Status and timestamps are excluded: they change as the claim moves
    /// through review without changing what the agents analysed.
    pub fn digest(&self) -> Result<ContentDigest> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("status");
            map.remove("created_at");
            map.remove("updated_at");
        }
        let bytes = serde_json::to_vec(&value)?;
        Ok(ContentDigest::from_bytes(&bytes))
    }

    /// `year make model` for display.
    pub fn vehicle_label(&self) -> String {
        let v = &self.vehicle_data;
        format!("{} {} {}", v.year, v.make, v.model)
    }
}
