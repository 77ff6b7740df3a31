// lib/src/access.rs
//
// Ownership checks shared by every service. A record is owned by the
// (doctor, patient) pair fixed at creation; a doctor acts on the doctor side,
// a patient on the patient side.

use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{
    BaselineAssessment, Event, FollowUpAssessment, MedicalProfile, Principal, Role, Session, User,
};

use crate::storage_engine::CareStore;

pub trait Owned {
    fn owning_doctor(&self) -> Uuid;
    fn owning_patient(&self) -> Uuid;

    /// True when `who` is the owner on their role's side.
    fn is_owned_by(&self, who: &Principal) -> bool {
        match who.role {
            Role::Doctor => self.owning_doctor() == who.id,
            Role::Patient => self.owning_patient() == who.id,
        }
    }
}

macro_rules! impl_owned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Owned for $ty {
                fn owning_doctor(&self) -> Uuid {
                    self.doctor_id
                }

                fn owning_patient(&self) -> Uuid {
                    self.patient_id
                }
            }
        )*
    };
}

impl_owned!(Session, Event, MedicalProfile, BaselineAssessment, FollowUpAssessment);

/// Fails with `Forbidden` unless `who` owns `resource`.
pub fn ensure_owner<R: Owned>(resource: &R, who: &Principal, what: &str) -> CareResult<()> {
    if resource.is_owned_by(who) {
        Ok(())
    } else {
        Err(CareError::forbidden(format!(
            "Forbidden: {} not owner of {}",
            who.role, what
        )))
    }
}

/// Fails with `Forbidden` unless `who` has the given role.
pub fn ensure_role(who: &Principal, role: Role) -> CareResult<()> {
    if who.role == role {
        Ok(())
    } else {
        Err(CareError::forbidden("Forbidden: insufficient role"))
    }
}

/// Loads a patient and checks it is assigned to `doctor_id`.
pub async fn assigned_patient(
    store: &dyn CareStore,
    doctor_id: Uuid,
    patient_id: Uuid,
) -> CareResult<User> {
    let patient = store
        .get_user(patient_id)
        .await?
        .filter(User::is_patient)
        .ok_or_else(|| CareError::not_found("Patient not found"))?;
    if patient.doctor_id != Some(doctor_id) {
        return Err(CareError::forbidden("Forbidden: patient not assigned to doctor"));
    }
    Ok(patient)
}

/// Resolves which patient a read is about.
///
/// Patients always read their own records and any requested id is ignored.
/// Doctors must name a patient assigned to them.
pub async fn patient_in_scope(
    store: &dyn CareStore,
    who: &Principal,
    requested: Option<Uuid>,
) -> CareResult<User> {
    match who.role {
        Role::Patient => store
            .get_user(who.id)
            .await?
            .filter(User::is_patient)
            .ok_or_else(|| CareError::not_found("Patient not found")),
        Role::Doctor => {
            let patient_id = requested
                .ok_or_else(|| CareError::invalid("patientId is required for doctor requests"))?;
            assigned_patient(store, who.id, patient_id).await
        }
    }
}

/// The doctor a patient is assigned to. Every patient should have one; a
/// missing reference makes session and record creation impossible.
pub fn assigned_doctor(patient: &User) -> CareResult<Uuid> {
    patient
        .doctor_id
        .ok_or_else(|| CareError::invalid("No assigned doctor found"))
}
