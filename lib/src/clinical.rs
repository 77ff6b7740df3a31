// lib/src/clinical.rs
//
// Doctor-authored clinical documents. Writes are restricted to the patient's
// assigned doctor; reads are open to that doctor and the patient.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::info;
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{
    BaselineAssessment, BaselineDetails, FollowUpAssessment, FollowUpDetails, MedicalProfile,
    Principal, ProfileDetails, Role,
};

use crate::access::{assigned_patient, ensure_role, patient_in_scope};
use crate::storage_engine::CareStore;

#[derive(Clone)]
pub struct ClinicalRecords {
    store: Arc<dyn CareStore>,
}

impl ClinicalRecords {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        ClinicalRecords { store }
    }

    pub async fn upsert_profile(
        &self,
        doctor: &Principal,
        patient_id: Uuid,
        details: ProfileDetails,
    ) -> CareResult<MedicalProfile> {
        ensure_role(doctor, Role::Doctor)?;
        let patient = assigned_patient(self.store.as_ref(), doctor.id, patient_id).await?;
        let previous = self.store.get_profile(patient.id).await?;
        let profile = MedicalProfile::upserted(previous.as_ref(), patient.id, doctor.id, details);
        self.store.put_profile(&profile).await?;
        info!("Doctor {} saved medical profile of patient {}", doctor.id, patient.id);
        Ok(profile)
    }

    pub async fn profile(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
    ) -> CareResult<MedicalProfile> {
        let patient = patient_in_scope(self.store.as_ref(), who, requested_patient).await?;
        self.store
            .get_profile(patient.id)
            .await?
            .ok_or_else(|| CareError::not_found("Medical profile not found"))
    }

    pub async fn upsert_baseline(
        &self,
        doctor: &Principal,
        patient_id: Uuid,
        details: BaselineDetails,
    ) -> CareResult<BaselineAssessment> {
        ensure_role(doctor, Role::Doctor)?;
        let patient = assigned_patient(self.store.as_ref(), doctor.id, patient_id).await?;
        let previous = self.store.get_baseline(patient.id).await?;
        let baseline = BaselineAssessment::upserted(previous.as_ref(), patient.id, doctor.id, details);
        self.store.put_baseline(&baseline).await?;
        info!("Doctor {} saved baseline assessment of patient {}", doctor.id, patient.id);
        Ok(baseline)
    }

    pub async fn baseline(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
    ) -> CareResult<BaselineAssessment> {
        let patient = patient_in_scope(self.store.as_ref(), who, requested_patient).await?;
        self.store
            .get_baseline(patient.id)
            .await?
            .ok_or_else(|| CareError::not_found("Baseline assessment not found"))
    }

    /// Upserts the follow-up of `visit_date` (today when absent).
    pub async fn upsert_followup(
        &self,
        doctor: &Principal,
        patient_id: Uuid,
        visit_date: Option<NaiveDate>,
        details: FollowUpDetails,
    ) -> CareResult<FollowUpAssessment> {
        ensure_role(doctor, Role::Doctor)?;
        details.validate()?;
        let patient = assigned_patient(self.store.as_ref(), doctor.id, patient_id).await?;
        let visit_date = visit_date.unwrap_or_else(|| Utc::now().date_naive());

        let previous = self.store.get_followup(patient.id, visit_date).await?;
        let followup =
            FollowUpAssessment::upserted(previous.as_ref(), patient.id, doctor.id, visit_date, details);
        self.store.put_followup(&followup).await?;
        info!(
            "Doctor {} saved follow-up of patient {} for {}",
            doctor.id, patient.id, visit_date
        );
        Ok(followup)
    }

    /// Follow-ups of a patient, most recent visit first.
    pub async fn followups(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
    ) -> CareResult<Vec<FollowUpAssessment>> {
        let patient = patient_in_scope(self.store.as_ref(), who, requested_patient).await?;
        self.store.followups_for_patient(patient.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Clinic;
    use models::medical::Wellbeing;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn only_assigned_doctor_writes_profile() {
        let clinic = Clinic::in_memory().await;
        let records = ClinicalRecords::new(clinic.store.clone());

        let err = records
            .upsert_profile(&clinic.other_doctor_principal(), clinic.patient.id, ProfileDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));

        let err = records
            .upsert_profile(&clinic.patient_principal(), clinic.patient.id, ProfileDetails::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));

        let err = records.profile(&clinic.patient_principal(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "Medical profile not found");
    }

    #[tokio::test]
    async fn profile_upsert_is_readable_by_both_sides() {
        let clinic = Clinic::in_memory().await;
        let records = ClinicalRecords::new(clinic.store.clone());
        let details = ProfileDetails { age: Some(61), ..Default::default() };
        let first = records
            .upsert_profile(&clinic.doctor_principal(), clinic.patient.id, details.clone())
            .await
            .unwrap();
        let second = records
            .upsert_profile(&clinic.doctor_principal(), clinic.patient.id, details)
            .await
            .unwrap();
        assert_eq!(first.created_at, second.created_at);

        let mine = records.profile(&clinic.patient_principal(), None).await.unwrap();
        assert_eq!(mine.details.age, Some(61));
        let theirs = records
            .profile(&clinic.doctor_principal(), Some(clinic.patient.id))
            .await
            .unwrap();
        assert_eq!(theirs.patient_id, clinic.patient.id);
    }

    #[tokio::test]
    async fn baseline_upsert_stamps_updated_at_on_second_write() {
        let clinic = Clinic::in_memory().await;
        let records = ClinicalRecords::new(clinic.store.clone());
        let doctor = clinic.doctor_principal();
        let first = records
            .upsert_baseline(&doctor, clinic.patient.id, BaselineDetails::default())
            .await
            .unwrap();
        assert!(first.updated_at.is_none());
        let second = records
            .upsert_baseline(&doctor, clinic.patient.id, BaselineDetails::default())
            .await
            .unwrap();
        assert!(second.updated_at.is_some());
        assert!(records.baseline(&clinic.other_patient_principal(), None).await.is_err());
    }

    #[tokio::test]
    async fn followups_are_keyed_by_visit_date() {
        let clinic = Clinic::in_memory().await;
        let records = ClinicalRecords::new(clinic.store.clone());
        let doctor = clinic.doctor_principal();

        let a = records
            .upsert_followup(&doctor, clinic.patient.id, Some(date(2025, 1, 10)), FollowUpDetails::default())
            .await
            .unwrap();
        let a_again = records
            .upsert_followup(&doctor, clinic.patient.id, Some(date(2025, 1, 10)), FollowUpDetails::default())
            .await
            .unwrap();
        assert_eq!(a.id, a_again.id);
        records
            .upsert_followup(&doctor, clinic.patient.id, Some(date(2025, 2, 10)), FollowUpDetails::default())
            .await
            .unwrap();

        let listed = records.followups(&clinic.patient_principal(), None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].visit_date, date(2025, 2, 10));
    }

    #[tokio::test]
    async fn followup_scores_are_validated() {
        let clinic = Clinic::in_memory().await;
        let records = ClinicalRecords::new(clinic.store.clone());
        let details = FollowUpDetails {
            wellbeing: Some(Wellbeing { overall: Some(9), ..Default::default() }),
            ..Default::default()
        };
        let err = records
            .upsert_followup(&clinic.doctor_principal(), clinic.patient.id, None, details)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "wellbeing.overall must be between 1 and 5");
    }
}
