// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use models::errors::CareResult;
use models::medical::{
    BaselineAssessment, Event, FollowUpAssessment, Image, MedicalProfile, Session, User,
};

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Adds a new user. Fails with `CareError::Conflict` when the email is taken.
    async fn insert_user(&self, user: &User) -> CareResult<()>;
    async fn get_user(&self, id: Uuid) -> CareResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> CareResult<Option<User>>;
    /// Patients whose assigned doctor is `doctor_id`.
    async fn patients_of(&self, doctor_id: Uuid) -> CareResult<Vec<User>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn insert_session(&self, session: &Session) -> CareResult<()>;
    /// Replaces a stored session in place.
    async fn update_session(&self, session: &Session) -> CareResult<()>;
    async fn get_session(&self, id: Uuid) -> CareResult<Option<Session>>;
    /// All sessions of a patient, oldest first.
    async fn sessions_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Session>>;
    /// Dialysis sessions drawn against one material session, oldest first.
    async fn dialysis_sessions_for_material(&self, material_session_id: Uuid) -> CareResult<Vec<Session>>;
}

#[async_trait]
pub trait ImageStore: Send + Sync + 'static {
    async fn insert_image(&self, image: &Image) -> CareResult<()>;
    /// Images attached to any of `session_ids`, oldest upload first.
    async fn images_for_sessions(&self, session_ids: &[Uuid]) -> CareResult<Vec<Image>>;
}

#[async_trait]
pub trait ClinicalStore: Send + Sync + 'static {
    async fn get_profile(&self, patient_id: Uuid) -> CareResult<Option<MedicalProfile>>;
    /// Writes a profile. Fails with `CareError::Conflict` when its CR number
    /// already belongs to another patient.
    async fn put_profile(&self, profile: &MedicalProfile) -> CareResult<()>;
    async fn get_baseline(&self, patient_id: Uuid) -> CareResult<Option<BaselineAssessment>>;
    async fn put_baseline(&self, baseline: &BaselineAssessment) -> CareResult<()>;
    async fn get_followup(&self, patient_id: Uuid, visit_date: NaiveDate) -> CareResult<Option<FollowUpAssessment>>;
    async fn put_followup(&self, followup: &FollowUpAssessment) -> CareResult<()>;
    /// All follow-ups of a patient, most recent visit first.
    async fn followups_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<FollowUpAssessment>>;
}

#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn insert_event(&self, event: &Event) -> CareResult<()>;
    async fn update_event(&self, event: &Event) -> CareResult<()>;
    async fn get_event(&self, id: Uuid) -> CareResult<Option<Event>>;
    /// Events of a patient, most recent `eventDate` first.
    async fn events_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Event>>;
}

/// Everything the services need from a document store.
pub trait CareStore: UserStore + SessionStore + ImageStore + ClinicalStore + EventStore {
    fn engine_name(&self) -> &'static str;
}
