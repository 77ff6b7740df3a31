// models/src/medical/followup_assessment.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::baseline_assessment::{Dwell, Finding};
use super::medical_profile::DialysisType;
use crate::errors::{CareError, CareResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdPerformer {
    #[serde(rename = "Self")]
    Patient,
    Caregiver,
    Nurse,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Wellbeing {
    /// Likert 1-5.
    pub overall: Option<u8>,
    pub appetite: Option<String>,
    /// 0-10.
    pub sleep_quality: Option<u8>,
    /// 0-10.
    pub fatigue_level: Option<u8>,
    pub weight_trend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Symptoms {
    pub nausea: Option<bool>,
    pub pruritus: Option<bool>,
    pub breathlessness: Option<bool>,
    pub restless_legs: Option<bool>,
    pub poor_concentration: Option<bool>,
    pub drain_pain: Option<bool>,
    pub slow_drain: Option<bool>,
    pub cloudy_effluent: Option<bool>,
    pub recent_hospitalization: Option<Finding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Examination {
    pub bp_systolic: Option<u32>,
    pub bp_diastolic: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub edema: Option<bool>,
    pub crepitations: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Adequacy {
    pub bp_controlled: Option<bool>,
    pub urine_output_24h: Option<f64>,
    pub bmi: Option<f64>,
    pub muscle_loss: Option<bool>,
    pub albumin: Option<f64>,
    pub phosphate: Option<f64>,
    pub potassium: Option<f64>,
    pub bicarbonate: Option<f64>,
    pub weekly_ktv: Option<f64>,
    pub residual_cr_cl: Option<f64>,
    pub underdialysis_symptoms: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Complications {
    pub peritonitis_episodes: Option<u32>,
    pub exit_site_infection: Option<bool>,
    pub technique_issues: Option<bool>,
    pub hospitalizations: Option<bool>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FollowUpPlan {
    pub prescription_change_needed: Option<bool>,
    pub revised_prescription: Option<String>,
    pub medications: Option<String>,
    pub follow_up_advice: Option<String>,
    pub next_review_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FollowUpDetails {
    pub dialysis_type: Option<DialysisType>,
    pub pd_performed_by: Option<PdPerformer>,
    pub last_training_date: Option<NaiveDate>,
    pub wellbeing: Option<Wellbeing>,
    pub symptoms: Option<Symptoms>,
    pub examination: Option<Examination>,
    pub current_pd_prescription: Vec<Dwell>,
    pub adequacy: Option<Adequacy>,
    pub events: Option<Complications>,
    pub plan: Option<FollowUpPlan>,
}

impl FollowUpDetails {
    /// Checks the bounded scores.
    pub fn validate(&self) -> CareResult<()> {
        if let Some(wb) = &self.wellbeing {
            check_range("wellbeing.overall", wb.overall, 1, 5)?;
            check_range("wellbeing.sleepQuality", wb.sleep_quality, 0, 10)?;
            check_range("wellbeing.fatigueLevel", wb.fatigue_level, 0, 10)?;
        }
        Ok(())
    }
}

fn check_range(field: &str, value: Option<u8>, min: u8, max: u8) -> CareResult<()> {
    match value {
        Some(v) if v < min || v > max => Err(CareError::invalid(format!(
            "{} must be between {} and {}",
            field, min, max
        ))),
        _ => Ok(()),
    }
}

/// Snapshot of one follow-up visit. Unique per patient and visit date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpAssessment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub visit_date: NaiveDate,
    #[serde(flatten)]
    pub details: FollowUpDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUpAssessment {
    pub fn upserted(
        previous: Option<&FollowUpAssessment>,
        patient_id: Uuid,
        doctor_id: Uuid,
        visit_date: NaiveDate,
        details: FollowUpDetails,
    ) -> Self {
        let now = Utc::now();
        FollowUpAssessment {
            id: previous.map(|p| p.id).unwrap_or_else(Uuid::new_v4),
            patient_id,
            doctor_id,
            visit_date,
            details,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}
