// lib/src/storage_engine/inmemory_storage.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{
    BaselineAssessment, Event, FollowUpAssessment, Image, MedicalProfile, Session, User,
};

use super::storage_engine::{
    CareStore, ClinicalStore, EventStore, ImageStore, SessionStore, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    users_by_email: HashMap<String, Uuid>,
    sessions: HashMap<Uuid, Session>,
    images: HashMap<Uuid, Image>,
    profiles: HashMap<Uuid, MedicalProfile>,
    baselines: HashMap<Uuid, BaselineAssessment>,
    followups: HashMap<(Uuid, NaiveDate), FollowUpAssessment>,
    events: HashMap<Uuid, Event>,
}

/// Process-local store with the same semantics as the sled engine.
#[derive(Debug, Default)]
pub struct InMemoryCareStore {
    tables: RwLock<Tables>,
}

impl InMemoryCareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryCareStore {
    async fn insert_user(&self, user: &User) -> CareResult<()> {
        let mut t = self.tables.write().await;
        if t.users_by_email.contains_key(&user.email) {
            return Err(CareError::Conflict("Email already in use".to_string()));
        }
        t.users_by_email.insert(user.email.clone(), user.id);
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CareResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> CareResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users_by_email.get(email).and_then(|id| t.users.get(id)).cloned())
    }

    async fn patients_of(&self, doctor_id: Uuid) -> CareResult<Vec<User>> {
        let t = self.tables.read().await;
        let mut patients: Vec<User> = t
            .users
            .values()
            .filter(|u| u.is_patient() && u.doctor_id == Some(doctor_id))
            .cloned()
            .collect();
        patients.sort_by_key(|u| u.created_at);
        Ok(patients)
    }
}

#[async_trait]
impl SessionStore for InMemoryCareStore {
    async fn insert_session(&self, session: &Session) -> CareResult<()> {
        self.tables.write().await.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> CareResult<()> {
        let mut t = self.tables.write().await;
        match t.sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(CareError::not_found("Session not found")),
        }
    }

    async fn get_session(&self, id: Uuid) -> CareResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn sessions_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Session>> {
        let t = self.tables.read().await;
        let mut sessions: Vec<Session> = t
            .sessions
            .values()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn dialysis_sessions_for_material(&self, material_session_id: Uuid) -> CareResult<Vec<Session>> {
        let t = self.tables.read().await;
        let mut sessions: Vec<Session> = t
            .sessions
            .values()
            .filter(|s| s.material_session_id() == Some(material_session_id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}

#[async_trait]
impl ImageStore for InMemoryCareStore {
    async fn insert_image(&self, image: &Image) -> CareResult<()> {
        self.tables.write().await.images.insert(image.id, image.clone());
        Ok(())
    }

    async fn images_for_sessions(&self, session_ids: &[Uuid]) -> CareResult<Vec<Image>> {
        let t = self.tables.read().await;
        let mut images: Vec<Image> = t
            .images
            .values()
            .filter(|img| session_ids.contains(&img.session_id))
            .cloned()
            .collect();
        images.sort_by_key(|img| img.uploaded_at);
        Ok(images)
    }
}

#[async_trait]
impl ClinicalStore for InMemoryCareStore {
    async fn get_profile(&self, patient_id: Uuid) -> CareResult<Option<MedicalProfile>> {
        Ok(self.tables.read().await.profiles.get(&patient_id).cloned())
    }

    async fn put_profile(&self, profile: &MedicalProfile) -> CareResult<()> {
        let mut t = self.tables.write().await;
        if let Some(cr) = &profile.details.cr_number {
            let taken = t.profiles.values().any(|p| {
                p.patient_id != profile.patient_id && p.details.cr_number.as_ref() == Some(cr)
            });
            if taken {
                return Err(CareError::Conflict("crNumber already in use".to_string()));
            }
        }
        t.profiles.insert(profile.patient_id, profile.clone());
        Ok(())
    }

    async fn get_baseline(&self, patient_id: Uuid) -> CareResult<Option<BaselineAssessment>> {
        Ok(self.tables.read().await.baselines.get(&patient_id).cloned())
    }

    async fn put_baseline(&self, baseline: &BaselineAssessment) -> CareResult<()> {
        self.tables.write().await.baselines.insert(baseline.patient_id, baseline.clone());
        Ok(())
    }

    async fn get_followup(&self, patient_id: Uuid, visit_date: NaiveDate) -> CareResult<Option<FollowUpAssessment>> {
        Ok(self.tables.read().await.followups.get(&(patient_id, visit_date)).cloned())
    }

    async fn put_followup(&self, followup: &FollowUpAssessment) -> CareResult<()> {
        self.tables
            .write()
            .await
            .followups
            .insert((followup.patient_id, followup.visit_date), followup.clone());
        Ok(())
    }

    async fn followups_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<FollowUpAssessment>> {
        let t = self.tables.read().await;
        let mut followups: Vec<FollowUpAssessment> = t
            .followups
            .values()
            .filter(|f| f.patient_id == patient_id)
            .cloned()
            .collect();
        followups.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        Ok(followups)
    }
}

#[async_trait]
impl EventStore for InMemoryCareStore {
    async fn insert_event(&self, event: &Event) -> CareResult<()> {
        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> CareResult<()> {
        let mut t = self.tables.write().await;
        match t.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(())
            }
            None => Err(CareError::not_found("Event not found")),
        }
    }

    async fn get_event(&self, id: Uuid) -> CareResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn events_for_patient(&self, patient_id: Uuid) -> CareResult<Vec<Event>> {
        let t = self.tables.read().await;
        let mut events: Vec<Event> = t
            .events
            .values()
            .filter(|e| e.patient_id == patient_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.event_date.cmp(&a.event_date));
        Ok(events)
    }
}

impl CareStore for InMemoryCareStore {
    fn engine_name(&self) -> &'static str {
        "memory"
    }
}
