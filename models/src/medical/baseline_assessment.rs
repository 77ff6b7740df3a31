// models/src/medical/baseline_assessment.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::medical_profile::DialysisType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabEntry {
    pub value: Option<f64>,
    pub date: Option<NaiveDate>,
}

/// One dwell of a peritoneal dialysis prescription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dwell {
    pub dwell_timing: Option<String>,
    pub solution_strength: Option<String>,
    pub fill_volume: Option<f64>,
    pub dwell_duration_hours: Option<f64>,
    pub number_of_exchanges: Option<u32>,
    pub icodextrin_used: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Finding {
    pub present: Option<bool>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalExam {
    pub pulse: Option<u32>,
    pub bp_systolic: Option<u32>,
    pub bp_diastolic: Option<u32>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub pallor: Option<bool>,
    pub icterus: Option<bool>,
    pub cyanosis: Option<bool>,
    pub clubbing: Option<bool>,
    pub edema: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineLabs {
    pub hemoglobin: Option<LabEntry>,
    pub urea: Option<LabEntry>,
    pub creatinine: Option<LabEntry>,
    pub sodium: Option<LabEntry>,
    pub potassium: Option<LabEntry>,
    pub albumin: Option<LabEntry>,
    pub ktv: Option<LabEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlanAndAdvice {
    pub advised_prescription: Option<String>,
    pub medications: Option<String>,
    pub follow_up_instructions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaselineDetails {
    pub primary_diagnosis: Option<String>,
    pub native_kidney_disease: Option<String>,
    pub dialysis_type: Option<DialysisType>,
    pub pd_catheter_insertion_date: Option<NaiveDate>,
    pub catheter_technique: Option<String>,
    pub pd_start_date: Option<NaiveDate>,
    pub training_start_date: Option<NaiveDate>,
    pub training_completion_date: Option<NaiveDate>,
    pub peri_implant_complications: Option<Finding>,
    pub clinical_exam: Option<ClinicalExam>,
    pub pd_prescription: Vec<Dwell>,
    pub labs: Option<BaselineLabs>,
    pub plan_and_advice: Option<PlanAndAdvice>,
}

/// Clinical snapshot captured when home dialysis starts. At most one per patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineAssessment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub details: BaselineDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BaselineAssessment {
    pub fn upserted(
        previous: Option<&BaselineAssessment>,
        patient_id: Uuid,
        doctor_id: Uuid,
        details: BaselineDetails,
    ) -> Self {
        let now = Utc::now();
        match previous {
            Some(prev) => BaselineAssessment {
                patient_id,
                doctor_id,
                details,
                created_at: prev.created_at,
                updated_at: Some(now),
            },
            None => BaselineAssessment {
                patient_id,
                doctor_id,
                details,
                created_at: now,
                updated_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_prescription_and_labs() {
        let details: BaselineDetails = serde_json::from_str(
            r#"{
                "dialysisType": "PD",
                "pdStartDate": "2025-01-15",
                "pdPrescription": [
                    {"dwellTiming": "morning", "fillVolume": 2000, "icodextrinUsed": false}
                ],
                "labs": {"hemoglobin": {"value": 9.8, "date": "2025-01-10"}},
                "periImplantComplications": {"present": false}
            }"#,
        )
        .unwrap();
        assert_eq!(details.pd_prescription.len(), 1);
        assert_eq!(details.pd_prescription[0].fill_volume, Some(2000.0));
        let hb = details.labs.unwrap().hemoglobin.unwrap();
        assert_eq!(hb.value, Some(9.8));
        assert_eq!(details.pd_start_date, NaiveDate::from_ymd_opt(2025, 1, 15));
    }

    #[test]
    fn second_upsert_stamps_updated_at() {
        let (p, d) = (Uuid::new_v4(), Uuid::new_v4());
        let first = BaselineAssessment::upserted(None, p, d, BaselineDetails::default());
        assert!(first.updated_at.is_none());
        let second = BaselineAssessment::upserted(Some(&first), p, d, BaselineDetails::default());
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at.is_some());
    }
}
