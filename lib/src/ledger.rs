// lib/src/ledger.rs
//
// Material issuance and dialysis performance. Lifecycle rules live on the
// session variants in `models`; this module adds lookup, ownership and the
// allotment check.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::Mutex as TokioMutex;
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{
    remaining_sessions, DialysisReport, DialysisStatus, Image, ImageView, MaterialKit,
    MaterialStatus, Principal, Role, Session, SessionType, User, UserSummary,
};

use crate::access::{assigned_doctor, assigned_patient, ensure_role, patient_in_scope, Owned};
use crate::storage_engine::CareStore;

/// Allotment figures for one material session. Computed on read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub total_sessions_allowed: u32,
    pub completed_sessions: usize,
    pub remaining_sessions: u32,
}

impl Consumption {
    pub fn of(material: &Session, dialysis: &[Session]) -> Self {
        let allowed = material
            .as_material()
            .map(|m| m.materials.sessions_count)
            .unwrap_or(0);
        let used = dialysis
            .iter()
            .filter_map(Session::as_dialysis)
            .filter(|d| d.status.consumes_allotment())
            .count();
        Consumption {
            total_sessions_allowed: allowed,
            completed_sessions: used,
            remaining_sessions: remaining_sessions(allowed, used),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_sessions == 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DialysisSummary {
    pub session_id: Uuid,
    pub status: DialysisStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub parameters: Option<DialysisReport>,
    pub images: Vec<ImageView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSessionSummary {
    pub material_session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: MaterialStatus,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub materials: MaterialKit,
    #[serde(flatten)]
    pub consumption: Consumption,
    /// Doctor-uploaded photos of the handed-over supplies.
    pub material_images: Vec<ImageView>,
    pub dialysis_sessions: Vec<DialysisSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientMaterialSummary {
    pub patient: UserSummary,
    pub material_sessions: Vec<MaterialSessionSummary>,
}

type AllotmentLocks = Arc<TokioMutex<HashMap<Uuid, Arc<TokioMutex<()>>>>>;

#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn CareStore>,
    // One lock per material session, held across the allotment check and
    // the insert of the new dialysis session.
    allotment_locks: AllotmentLocks,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        SessionLedger {
            store,
            allotment_locks: Arc::new(TokioMutex::new(HashMap::new())),
        }
    }

    /// Doctor issues supplies to one of their patients.
    pub async fn create_material_session(
        &self,
        doctor: &Principal,
        patient_id: Uuid,
        materials: MaterialKit,
        notes: String,
    ) -> CareResult<Session> {
        ensure_role(doctor, Role::Doctor)?;
        let patient = assigned_patient(self.store.as_ref(), doctor.id, patient_id).await?;

        let session = Session::new_material(doctor.id, patient.id, materials, notes);
        self.store.insert_session(&session).await?;
        info!(
            "Doctor {} issued material session {} to patient {}",
            doctor.id, session.id, patient.id
        );
        Ok(session)
    }

    /// Patient starts a dialysis session against one of their material sessions.
    pub async fn start_dialysis_session(
        &self,
        patient: &Principal,
        material_session_id: Uuid,
    ) -> CareResult<Session> {
        ensure_role(patient, Role::Patient)?;
        let user = self
            .store
            .get_user(patient.id)
            .await?
            .filter(User::is_patient)
            .ok_or_else(|| CareError::invalid("Invalid patient"))?;
        let doctor_id = assigned_doctor(&user)?;

        let material = self
            .store
            .get_session(material_session_id)
            .await?
            .filter(|s| {
                s.session_type() == SessionType::Material
                    && s.patient_id == user.id
                    && s.doctor_id == doctor_id
            })
            .ok_or_else(|| CareError::not_found("Material session not found"))?;

        let lock = self.allotment_lock(material.id).await;
        let result = {
            let _guard = lock.lock().await;
            self.start_under_lock(&material, user.id, doctor_id).await
        };
        drop(lock);
        self.release_allotment_lock(material.id).await;
        result
    }

    async fn start_under_lock(
        &self,
        material: &Session,
        patient_id: Uuid,
        doctor_id: Uuid,
    ) -> CareResult<Session> {
        let existing = self.store.dialysis_sessions_for_material(material.id).await?;

        if let Some(active) = existing
            .iter()
            .find(|s| s.as_dialysis().map(|d| d.status) == Some(DialysisStatus::Active))
        {
            info!("Dialysis session {} is still active on material session {}", active.id, material.id);
            return Err(CareError::precondition(
                "Please complete the current dialysis session before starting a new one",
            ));
        }

        if Consumption::of(material, &existing).is_exhausted() {
            return Err(CareError::precondition(
                "All dialysis sessions for this material pack are exhausted. Please collect new material.",
            ));
        }

        let session = Session::new_dialysis(doctor_id, patient_id, material.id);
        self.store.insert_session(&session).await?;
        info!(
            "Patient {} started dialysis session {} against material session {}",
            patient_id, session.id, material.id
        );
        Ok(session)
    }

    async fn allotment_lock(&self, material_session_id: Uuid) -> Arc<TokioMutex<()>> {
        let mut locks = self.allotment_locks.lock().await;
        locks
            .entry(material_session_id)
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    async fn release_allotment_lock(&self, material_session_id: Uuid) {
        let mut locks = self.allotment_locks.lock().await;
        if let Some(lock) = locks.get(&material_session_id) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(&material_session_id);
            }
        }
    }

    /// Patient confirms receipt of the supplies.
    pub async fn acknowledge_material_session(
        &self,
        patient: &Principal,
        session_id: Uuid,
    ) -> CareResult<Session> {
        ensure_role(patient, Role::Patient)?;
        let mut session = self
            .owned_session(session_id, patient, SessionType::Material)
            .await
            .map_err(|_| CareError::not_found("Material session not found or unauthorized"))?;
        if let Some(material) = session.as_material_mut() {
            material.acknowledge(Utc::now())?;
        }
        self.store.update_session(&session).await?;
        info!("Patient {} acknowledged material session {}", patient.id, session.id);
        Ok(session)
    }

    /// Patient finishes an active dialysis session with their self-report.
    pub async fn finish_dialysis_session(
        &self,
        patient: &Principal,
        session_id: Uuid,
        report: DialysisReport,
    ) -> CareResult<Session> {
        ensure_role(patient, Role::Patient)?;
        let mut session = self
            .owned_session(session_id, patient, SessionType::Dialysis)
            .await
            .map_err(|_| CareError::not_found("Session not found or unauthorized"))?;
        if let Some(dialysis) = session.as_dialysis_mut() {
            dialysis.complete(report, Utc::now())?;
        }
        self.store.update_session(&session).await?;
        info!("Patient {} completed dialysis session {}", patient.id, session.id);
        Ok(session)
    }

    /// Owning doctor verifies a completed dialysis session.
    pub async fn verify_dialysis_session(
        &self,
        doctor: &Principal,
        session_id: Uuid,
        notes: Option<String>,
    ) -> CareResult<Session> {
        ensure_role(doctor, Role::Doctor)?;
        let mut session = self
            .owned_session(session_id, doctor, SessionType::Dialysis)
            .await
            .map_err(|_| CareError::not_found("Dialysis session not found or unauthorized"))?;
        if let Some(dialysis) = session.as_dialysis_mut() {
            dialysis.verify(doctor.id, notes, Utc::now())?;
        }
        self.store.update_session(&session).await?;
        info!("Doctor {} verified dialysis session {}", doctor.id, session.id);
        Ok(session)
    }

    /// Remaining allotment of a material session, for anyone who owns it.
    pub async fn consumption(
        &self,
        who: &Principal,
        material_session_id: Uuid,
    ) -> CareResult<Consumption> {
        let material = self
            .owned_session(material_session_id, who, SessionType::Material)
            .await?;
        let dialysis = self.store.dialysis_sessions_for_material(material.id).await?;
        Ok(Consumption::of(&material, &dialysis))
    }

    /// Every material session of a patient with its dialysis sessions and images.
    pub async fn material_summary(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
    ) -> CareResult<PatientMaterialSummary> {
        let patient = patient_in_scope(self.store.as_ref(), who, requested_patient).await?;
        let doctor_id = assigned_doctor(&patient)?;

        let sessions = self.store.sessions_for_patient(patient.id).await?;
        let materials: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.session_type() == SessionType::Material && s.doctor_id == doctor_id)
            .collect();
        let summaries = self.summarize(&materials, &sessions).await?;

        Ok(PatientMaterialSummary {
            patient: patient.summary(),
            material_sessions: summaries,
        })
    }

    /// The summary block for a single material session.
    pub async fn material_session_details(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
        material_session_id: Uuid,
    ) -> CareResult<MaterialSessionSummary> {
        let patient_id = match who.role {
            Role::Patient => who.id,
            Role::Doctor => {
                requested_patient.ok_or_else(|| CareError::invalid("patientId is required"))?
            }
        };
        let material = self
            .store
            .get_session(material_session_id)
            .await?
            .filter(|s| s.session_type() == SessionType::Material && s.patient_id == patient_id)
            .ok_or_else(|| CareError::not_found("Material session not found"))?;
        if who.role == Role::Doctor && material.doctor_id != who.id {
            return Err(CareError::forbidden("Unauthorized"));
        }

        let dialysis = self.store.dialysis_sessions_for_material(material.id).await?;
        let mut summaries = self.summarize(&[&material], &dialysis).await?;
        summaries
            .pop()
            .ok_or_else(|| CareError::Internal("empty material summary".to_string()))
    }

    /// Builds summary blocks for `materials`, drawing dialysis sessions from `pool`.
    async fn summarize(
        &self,
        materials: &[&Session],
        pool: &[Session],
    ) -> CareResult<Vec<MaterialSessionSummary>> {
        let material_ids: Vec<Uuid> = materials.iter().map(|m| m.id).collect();
        let mut by_material: HashMap<Uuid, Vec<Session>> = HashMap::new();
        for s in pool {
            if let Some(parent) = s.material_session_id() {
                if material_ids.contains(&parent) {
                    by_material.entry(parent).or_default().push(s.clone());
                }
            }
        }

        let mut session_ids = material_ids.clone();
        session_ids.extend(by_material.values().flatten().map(|s| s.id));
        let images = self.store.images_for_sessions(&session_ids).await?;
        let images_for = |session_id: Uuid, uploaded_by: Role| -> Vec<ImageView> {
            images
                .iter()
                .filter(|img| img.session_id == session_id && img.uploaded_by == uploaded_by)
                .map(Image::view)
                .collect()
        };

        let mut summaries = Vec::with_capacity(materials.len());
        for material in materials {
            let Some(m) = material.as_material() else {
                warn!("Session {} is not a material session; skipped in summary", material.id);
                continue;
            };
            let children = by_material.remove(&material.id).unwrap_or_default();
            let consumption = Consumption::of(material, &children);
            let dialysis_sessions = children
                .iter()
                .filter_map(|s| s.as_dialysis().map(|d| (s, d)))
                .map(|(s, d)| DialysisSummary {
                    session_id: s.id,
                    status: d.status,
                    created_at: s.created_at,
                    completed_at: d.completed_at,
                    verified_at: d.verified_at,
                    verification_notes: d.verification_notes.clone(),
                    parameters: d.parameters.clone(),
                    images: images_for(s.id, Role::Patient),
                })
                .collect();

            summaries.push(MaterialSessionSummary {
                material_session_id: material.id,
                created_at: material.created_at,
                status: m.status,
                acknowledged_at: m.acknowledged_at,
                notes: m.notes.clone(),
                materials: m.materials.clone(),
                consumption,
                material_images: images_for(material.id, Role::Doctor),
                dialysis_sessions,
            });
        }
        Ok(summaries)
    }

    /// Loads a session of the given type owned by `who`.
    async fn owned_session(
        &self,
        session_id: Uuid,
        who: &Principal,
        session_type: SessionType,
    ) -> CareResult<Session> {
        self.store
            .get_session(session_id)
            .await?
            .filter(|s| s.session_type() == session_type && s.is_owned_by(who))
            .ok_or_else(|| CareError::not_found("Session not found"))
    }
}
