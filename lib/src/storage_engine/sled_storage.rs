// lib/src/storage_engine/sled_storage.rs

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Transactional, Tree};
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{
    BaselineAssessment, Event, FollowUpAssessment, Image, MedicalProfile, Session, SessionKind, User,
};

use super::storage_engine::{
    CareStore, ClinicalStore, EventStore, ImageStore, SessionStore, UserStore,
};

/// Sled-backed document store. One tree per collection, JSON documents keyed
/// by UUID bytes, plus index trees for the unique keys.
pub struct SledCareStore {
    db: Db,
    users: Tree,
    users_by_email: Tree,
    sessions: Tree,
    images: Tree,
    profiles: Tree,
    profiles_by_cr_number: Tree,
    baselines: Tree,
    followups: Tree,
    events: Tree,
}

impl SledCareStore {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path) -> CareResult<Self> {
        info!("Opening Sled database at {}", path.display());
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway database removed when dropped.
    pub fn temporary() -> CareResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> CareResult<Self> {
        Ok(SledCareStore {
            users: db.open_tree("users")?,
            users_by_email: db.open_tree("users_by_email")?,
            sessions: db.open_tree("sessions")?,
            images: db.open_tree("images")?,
            profiles: db.open_tree("medical_profiles")?,
            profiles_by_cr_number: db.open_tree("medical_profiles_by_cr_number")?,
            baselines: db.open_tree("baseline_assessments")?,
            followups: db.open_tree("followup_assessments")?,
            events: db.open_tree("events")?,
            db,
        })
    }

    pub async fn flush(&self) -> CareResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> CareResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CareResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn get_doc<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> CareResult<Option<T>> {
    tree.get(key)?.map(|v| decode(&v)).transpose()
}

fn collect_docs<T, I>(iter: I, keep: impl Fn(&T) -> bool) -> CareResult<Vec<T>>
where
    T: DeserializeOwned,
    I: Iterator<Item = sled::Result<(IVec, IVec)>>,
{
    let mut docs = Vec::new();
    for item in iter {
        let (_key, value) = item?;
        let doc: T = decode(&value)?;
        if keep(&doc) {
            docs.push(doc);
        }
    }
    Ok(docs)
}

/// Follow-ups are keyed by patient then visit date so a prefix scan yields
/// every visit of one patient.
fn followup_key(patient_id: Uuid, visit_date: NaiveDate) -> Vec<u8> {
    let mut key = patient_id.as_bytes().to_vec();
    key.extend_from_slice(visit_date.format("%Y-%m-%d").to_string().as_bytes());
    key
}

#[async_trait]
impl UserStore for SledCareStore {
    async fn insert_user(&self, user: &User) -> CareResult<()> {
        let doc = encode(user)?;
        // The email claim and the document land together or not at all.
        let outcome = (&self.users, &self.users_by_email).transaction(|(users, by_email)| {
            if by_email.get(user.email.as_bytes())?.is_some() {
                return Err(ConflictableTransactionError::Abort(()));
            }
            by_email.insert(user.email.as_bytes(), user.id.as_bytes().to_vec())?;
            users.insert(user.id.as_bytes(), doc.clone())?;
            Ok(())
        });
        match outcome {
            Ok(()) => {
                debug!("Stored user {} ({})", user.id, user.role);
                Ok(())
            }
            Err(TransactionError::Abort(())) => {
                Err(CareError::Conflict("Email already in use".to_string()))
            }
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    async fn get_user(&self, id: Uuid) -> CareResult<Option<User>> {
        get_doc(&self.users, id.as_bytes())
    }

    async fn get_user_by_email(&self, email: &str) -> CareResult<Option<User>> {
        match self.users_by_email.get(email.as_bytes())? {
            Some(id_bytes) => {
                let id = Uuid::from_slice(&id_bytes)
                    .map_err(|e| CareError::Storage(format!("Corrupt email index entry: {}", e)))?;
                self.get_user(id).await
            }
            None => Ok(None),
        }
    }

    async fn patients_of(&self, doctor_id: Uuid) -> CareResult<Vec<User>> {
        let mut patients: Vec<User> = collect_docs(self.users.iter(), |u: &User| {
            u.is_patient() && u.doctor_id == Some(doctor_id)
        })?;
        patients.sort_by_key(|u| u.created_at);
        Ok(patients)
    }
}

#[async_trait]
impl SessionStore for SledCareStore {
    async fn insert_session(&self, session: &Session) -> CareResult<()> {
        self.sessions.insert(session.id.as_bytes(), encode(session)?)?;
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> CareResult<()> {
        if !self.sessions.contains_key(session.id.as_bytes())? {
            return Err(CareError::not_found("Session not found"));
        }
        self.sessions.insert(session.id.as_bytes(), encode(session)?)?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> CareResult<Option<Session>> {
        get_doc(&self.sessions, id.as_bytes())
    }

    async fn sessions_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Session>> {
        let mut sessions: Vec<Session> =
            collect_docs(self.sessions.iter(), |s: &Session| s.patient_id == patient_id)?;
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn dialysis_sessions_for_material(&self, material_session_id: Uuid) -> CareResult<Vec<Session>> {
        let mut sessions: Vec<Session> = collect_docs(self.sessions.iter(), |s: &Session| {
            matches!(&s.kind, SessionKind::Dialysis(d) if d.material_session_id == material_session_id)
        })?;
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}

#[async_trait]
impl ImageStore for SledCareStore {
    async fn insert_image(&self, image: &Image) -> CareResult<()> {
        self.images.insert(image.id.as_bytes(), encode(image)?)?;
        Ok(())
    }

    async fn images_for_sessions(&self, session_ids: &[Uuid]) -> CareResult<Vec<Image>> {
        let wanted: HashSet<Uuid> = session_ids.iter().copied().collect();
        let mut images: Vec<Image> =
            collect_docs(self.images.iter(), |img: &Image| wanted.contains(&img.session_id))?;
        images.sort_by_key(|img| img.uploaded_at);
        Ok(images)
    }
}

#[async_trait]
impl ClinicalStore for SledCareStore {
    async fn get_profile(&self, patient_id: Uuid) -> CareResult<Option<MedicalProfile>> {
        get_doc(&self.profiles, patient_id.as_bytes())
    }

    async fn put_profile(&self, profile: &MedicalProfile) -> CareResult<()> {
        let key = profile.patient_id.as_bytes();
        let previous: Option<MedicalProfile> = get_doc(&self.profiles, key)?;
        let owner = profile.patient_id.as_bytes().to_vec();
        let new_cr = profile.details.cr_number.clone();

        if let Some(cr) = &new_cr {
            let claimed = self.profiles_by_cr_number.compare_and_swap(
                cr.as_bytes(),
                None::<&[u8]>,
                Some(owner.clone()),
            )?;
            if let Err(existing) = claimed {
                if existing.current.as_deref() != Some(owner.as_slice()) {
                    return Err(CareError::Conflict("crNumber already in use".to_string()));
                }
            }
        }

        self.profiles.insert(key, encode(profile)?)?;

        if let Some(old_cr) = previous.and_then(|p| p.details.cr_number) {
            if new_cr.as_ref() != Some(&old_cr) {
                self.profiles_by_cr_number.remove(old_cr.as_bytes())?;
            }
        }
        Ok(())
    }

    async fn get_baseline(&self, patient_id: Uuid) -> CareResult<Option<BaselineAssessment>> {
        get_doc(&self.baselines, patient_id.as_bytes())
    }

    async fn put_baseline(&self, baseline: &BaselineAssessment) -> CareResult<()> {
        self.baselines.insert(baseline.patient_id.as_bytes(), encode(baseline)?)?;
        Ok(())
    }

    async fn get_followup(&self, patient_id: Uuid, visit_date: NaiveDate) -> CareResult<Option<FollowUpAssessment>> {
        get_doc(&self.followups, &followup_key(patient_id, visit_date))
    }

    async fn put_followup(&self, followup: &FollowUpAssessment) -> CareResult<()> {
        let key = followup_key(followup.patient_id, followup.visit_date);
        self.followups.insert(key, encode(followup)?)?;
        Ok(())
    }

    async fn followups_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<FollowUpAssessment>> {
        let mut followups: Vec<FollowUpAssessment> =
            collect_docs(self.followups.scan_prefix(patient_id.as_bytes()), |_| true)?;
        followups.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        Ok(followups)
    }
}

#[async_trait]
impl EventStore for SledCareStore {
    async fn insert_event(&self, event: &Event) -> CareResult<()> {
        self.events.insert(event.id.as_bytes(), encode(event)?)?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> CareResult<()> {
        if !self.events.contains_key(event.id.as_bytes())? {
            return Err(CareError::not_found("Event not found"));
        }
        self.events.insert(event.id.as_bytes(), encode(event)?)?;
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> CareResult<Option<Event>> {
        get_doc(&self.events, id.as_bytes())
    }

    async fn events_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Event>> {
        let mut events: Vec<Event> =
            collect_docs(self.events.iter(), |e: &Event| e.patient_id == patient_id)?;
        events.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(events)
    }
}

impl CareStore for SledCareStore {
    fn engine_name(&self) -> &'static str {
        "sled"
    }
}
