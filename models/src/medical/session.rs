// models/src/medical/session.rs
//
// A session is either a material issuance (doctor hands supplies to a
// patient) or a dialysis episode performed by the patient against one of
// those issuances. Both share ownership fields; everything else lives in the
// variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::lenient;
use crate::errors::{CareError, CareResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: SessionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionKind {
    Material(MaterialSession),
    Dialysis(DialysisSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Material,
    Dialysis,
}

impl Session {
    pub fn new_material(
        doctor_id: Uuid,
        patient_id: Uuid,
        materials: MaterialKit,
        notes: String,
    ) -> Self {
        Session {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            created_at: Utc::now(),
            kind: SessionKind::Material(MaterialSession {
                status: MaterialStatus::Active,
                notes,
                materials,
                acknowledged_at: None,
            }),
        }
    }

    pub fn new_dialysis(doctor_id: Uuid, patient_id: Uuid, material_session_id: Uuid) -> Self {
        Session {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            created_at: Utc::now(),
            kind: SessionKind::Dialysis(DialysisSession {
                material_session_id,
                status: DialysisStatus::Active,
                parameters: None,
                completed_at: None,
                verified_at: None,
                verified_by: None,
                verification_notes: None,
            }),
        }
    }

    pub fn session_type(&self) -> SessionType {
        match self.kind {
            SessionKind::Material(_) => SessionType::Material,
            SessionKind::Dialysis(_) => SessionType::Dialysis,
        }
    }

    pub fn as_material(&self) -> Option<&MaterialSession> {
        match &self.kind {
            SessionKind::Material(m) => Some(m),
            SessionKind::Dialysis(_) => None,
        }
    }

    pub fn as_material_mut(&mut self) -> Option<&mut MaterialSession> {
        match &mut self.kind {
            SessionKind::Material(m) => Some(m),
            SessionKind::Dialysis(_) => None,
        }
    }

    pub fn as_dialysis(&self) -> Option<&DialysisSession> {
        match &self.kind {
            SessionKind::Dialysis(d) => Some(d),
            SessionKind::Material(_) => None,
        }
    }

    pub fn as_dialysis_mut(&mut self) -> Option<&mut DialysisSession> {
        match &mut self.kind {
            SessionKind::Dialysis(d) => Some(d),
            SessionKind::Material(_) => None,
        }
    }

    /// Parent material session, for dialysis sessions only.
    pub fn material_session_id(&self) -> Option<Uuid> {
        self.as_dialysis().map(|d| d.material_session_id)
    }
}

// ------------------- MATERIAL -------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialStatus {
    Active,
    Acknowledged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSession {
    pub status: MaterialStatus,
    #[serde(default)]
    pub notes: String,
    pub materials: MaterialKit,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl MaterialSession {
    /// Patient confirms receipt of the supplies.
    pub fn acknowledge(&mut self, at: DateTime<Utc>) -> CareResult<()> {
        if self.status != MaterialStatus::Active {
            return Err(CareError::precondition(
                "Only active material sessions can be acknowledged",
            ));
        }
        self.status = MaterialStatus::Acknowledged;
        self.acknowledged_at = Some(at);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialysisMachine {
    Portable,
    Standard,
    #[default]
    None,
}

// Anything but a listed machine, `null` included, is `none`.
impl<'de> Deserialize<'de> for DialysisMachine {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("portable") => DialysisMachine::Portable,
            Some("standard") => DialysisMachine::Standard,
            _ => DialysisMachine::None,
        })
    }
}

/// Supplies handed over in one material session, plus how many dialysis
/// sessions they are meant to cover.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaterialKit {
    #[serde(deserialize_with = "lenient::count")]
    pub sessions_count: u32,
    pub dialysis_machine: DialysisMachine,
    #[serde(deserialize_with = "lenient::flag")]
    pub dialyzer: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub blood_tubing_sets: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub dialysis_needles: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub dialysate_concentrates: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub heparin: bool,
    #[serde(deserialize_with = "lenient::flag")]
    pub saline_solution: bool,
}

/// Allotment left on a material kit. Never negative.
pub fn remaining_sessions(allowed: u32, consumed: usize) -> u32 {
    let consumed = u32::try_from(consumed).unwrap_or(u32::MAX);
    allowed.saturating_sub(consumed)
}

// ------------------- DIALYSIS -------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialysisStatus {
    Active,
    Completed,
    Verified,
}

impl DialysisStatus {
    /// Completed and verified sessions both use up one unit of the allotment.
    pub fn consumes_allotment(&self) -> bool {
        matches!(self, DialysisStatus::Completed | DialysisStatus::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialysisSession {
    pub material_session_id: Uuid,
    pub status: DialysisStatus,
    pub parameters: Option<DialysisReport>,
    pub completed_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verification_notes: Option<String>,
}

impl DialysisSession {
    /// `active -> completed`, storing the patient's self-report.
    pub fn complete(&mut self, report: DialysisReport, at: DateTime<Utc>) -> CareResult<()> {
        if self.status != DialysisStatus::Active {
            return Err(CareError::precondition(
                "Only active dialysis sessions can be finished",
            ));
        }
        self.status = DialysisStatus::Completed;
        self.parameters = Some(report);
        self.completed_at = Some(at);
        Ok(())
    }

    /// `completed -> verified`, by the owning doctor.
    pub fn verify(
        &mut self,
        doctor_id: Uuid,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> CareResult<()> {
        if self.status != DialysisStatus::Completed {
            return Err(CareError::precondition(
                "Only completed dialysis sessions can be verified",
            ));
        }
        self.status = DialysisStatus::Verified;
        self.verified_at = Some(at);
        self.verified_by = Some(doctor_id);
        self.verification_notes = Some(notes.unwrap_or_default());
        Ok(())
    }
}

/// What the patient reports when finishing a dialysis session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialysisReport {
    pub voluntary: SelfReport,
    pub dialysis: ExchangeParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelfReport {
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub feeling_ok: Option<bool>,
    #[serde(deserialize_with = "lenient::optional_flag")]
    pub fever: Option<bool>,
    #[serde(deserialize_with = "lenient::text")]
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangeParameters {
    /// Millilitres.
    #[serde(deserialize_with = "lenient::optional_number")]
    pub fill_volume: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub drain_volume: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub fill_time: Option<String>,
    #[serde(deserialize_with = "lenient::optional_text")]
    pub drain_time: Option<String>,
    /// As written by the patient, e.g. `"120/80"`.
    #[serde(deserialize_with = "lenient::optional_text")]
    pub blood_pressure: Option<String>,
    /// Kilograms.
    #[serde(deserialize_with = "lenient::optional_number")]
    pub weight_pre: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub weight_post: Option<f64>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub number_of_exchanges: Option<u32>,
    #[serde(deserialize_with = "lenient::optional_count")]
    pub duration_minutes: Option<u32>,
}
