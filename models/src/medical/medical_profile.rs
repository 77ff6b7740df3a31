// models/src/medical/medical_profile.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialysisType {
    #[serde(rename = "HD")]
    Hemodialysis,
    #[serde(rename = "PD")]
    Peritoneal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EducationLevel {
    #[serde(rename = "No formal education")]
    NoFormalEducation,
    Primary,
    Middle,
    Secondary,
    #[serde(rename = "Higher secondary")]
    HigherSecondary,
    Graduate,
    #[serde(rename = "Post-graduate / Professional")]
    PostGraduate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncomeLevel {
    Upper,
    #[serde(rename = "Upper middle")]
    UpperMiddle,
    #[serde(rename = "Lower middle")]
    LowerMiddle,
    #[serde(rename = "Upper lower")]
    UpperLower,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeKidneyDisease {
    #[serde(rename = "Diabetic kidney disease")]
    DiabeticKidneyDisease,
    #[serde(rename = "Hypertensive nephrosclerosis")]
    HypertensiveNephrosclerosis,
    #[serde(rename = "Chronic glomerulonephritis")]
    ChronicGlomerulonephritis,
    #[serde(rename = "IgA nephropathy")]
    IgaNephropathy,
    #[serde(rename = "FSGS")]
    Fsgs,
    #[serde(rename = "Membranous nephropathy")]
    MembranousNephropathy,
    #[serde(rename = "Other GN")]
    OtherGlomerulonephritis,
    #[serde(rename = "CKD of unknown etiology")]
    UnknownEtiology,
    #[serde(rename = "Reflux nephropathy")]
    RefluxNephropathy,
    #[serde(rename = "Obstructive uropathy")]
    ObstructiveUropathy,
    #[serde(rename = "Polycystic kidney disease")]
    PolycysticKidneyDisease,
    #[serde(rename = "Tubulointerstitial disease")]
    TubulointerstitialDisease,
    #[serde(rename = "Congenital / hereditary")]
    Congenital,
    Others,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relation: Option<String>,
}

/// Doctor-editable demographic and diagnosis fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileDetails {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    /// Hospital registration number, unique across patients when present.
    pub cr_number: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
    pub education_level: Option<EducationLevel>,
    pub income_level: Option<IncomeLevel>,
    pub primary_diagnosis: Option<String>,
    pub native_kidney_disease: Option<NativeKidneyDisease>,
    pub dialysis_type: Option<DialysisType>,
    pub allergies: Vec<String>,
    pub emergency_contact: Option<EmergencyContact>,
}

impl ProfileDetails {
    /// CR number with surrounding whitespace removed; blank counts as absent.
    pub fn normalized_cr_number(&self) -> Option<String> {
        self.cr_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// At most one per patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalProfile {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(flatten)]
    pub details: ProfileDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalProfile {
    /// Builds the next version of a profile, keeping the original creation time.
    pub fn upserted(
        previous: Option<&MedicalProfile>,
        patient_id: Uuid,
        doctor_id: Uuid,
        mut details: ProfileDetails,
    ) -> Self {
        let now = Utc::now();
        details.cr_number = details.normalized_cr_number();
        MedicalProfile {
            patient_id,
            doctor_id,
            details,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}
