// lib/src/directory.rs

use std::sync::Arc;

use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{Principal, Role, User, UserSummary};

use crate::access::{assigned_patient, ensure_role};
use crate::storage_engine::CareStore;

/// Read access to doctor and patient accounts.
#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn CareStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Directory { store }
    }

    /// Patients assigned to the calling doctor. `requested_doctor_id` must be the caller.
    pub async fn patients_of(
        &self,
        doctor: &Principal,
        requested_doctor_id: Uuid,
    ) -> CareResult<Vec<UserSummary>> {
        ensure_role(doctor, Role::Doctor)?;
        if requested_doctor_id != doctor.id {
            return Err(CareError::forbidden("Unauthorized access"));
        }
        let patients = self.store.patients_of(doctor.id).await?;
        Ok(patients.iter().map(User::summary).collect())
    }

    /// A patient's basic details. Patients may read themselves, doctors their own patients.
    pub async fn patient_details(
        &self,
        who: &Principal,
        patient_id: Uuid,
    ) -> CareResult<UserSummary> {
        match who.role {
            Role::Patient if who.id != patient_id => {
                Err(CareError::forbidden("Access denied"))
            }
            Role::Patient => self
                .store
                .get_user(patient_id)
                .await?
                .filter(User::is_patient)
                .map(|u| u.summary())
                .ok_or_else(|| CareError::not_found("Patient not found")),
            Role::Doctor => assigned_patient(self.store.as_ref(), who.id, patient_id)
                .await
                .map(|u| u.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Clinic;

    #[tokio::test]
    async fn doctor_lists_only_own_patients() {
        let clinic = Clinic::in_memory().await;
        let directory = Directory::new(clinic.store.clone());
        let doctor = clinic.doctor_principal();

        let patients = directory.patients_of(&doctor, doctor.id).await.unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, clinic.patient.id);

        let err = directory
            .patients_of(&doctor, clinic.other_doctor.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unauthorized access");
    }

    #[tokio::test]
    async fn patient_details_respects_scope() {
        let clinic = Clinic::in_memory().await;
        let directory = Directory::new(clinic.store.clone());

        let me = directory
            .patient_details(&clinic.patient_principal(), clinic.patient.id)
            .await
            .unwrap();
        assert_eq!(me.email, "patient@example.com");

        let err = directory
            .patient_details(&clinic.patient_principal(), clinic.other_patient.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));

        let err = directory
            .patient_details(&clinic.doctor_principal(), clinic.other_patient.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CareError::Forbidden(_)));
    }
}
