// lib/src/events.rs

use std::sync::Arc;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{Event, EventOrigin, NewEvent, Principal, Role, User};

use crate::access::{assigned_doctor, assigned_patient, ensure_owner, ensure_role, patient_in_scope};
use crate::storage_engine::CareStore;

/// Adverse events per patient.
#[derive(Clone)]
pub struct EventLog {
    store: Arc<dyn CareStore>,
}

impl EventLog {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        EventLog { store }
    }

    /// Records an event on behalf of a doctor or a patient.
    ///
    /// A patient always records against themself and their assigned doctor,
    /// whatever `requested_patient` says. A doctor must name one of their patients.
    pub async fn record(
        &self,
        who: &Principal,
        requested_patient: Option<Uuid>,
        input: NewEvent,
    ) -> CareResult<Event> {
        let patient = match who.role {
            Role::Patient => patient_in_scope(self.store.as_ref(), who, None).await?,
            Role::Doctor => {
                let patient_id = requested_patient
                    .ok_or_else(|| CareError::invalid("patientId is required"))?;
                assigned_patient(self.store.as_ref(), who.id, patient_id).await?
            }
        };
        self.insert(&patient, EventOrigin::from(who.role), input).await
    }

    /// Records an event raised by the service itself rather than a user.
    pub async fn record_system_event(&self, patient_id: Uuid, input: NewEvent) -> CareResult<Event> {
        let patient = self
            .store
            .get_user(patient_id)
            .await?
            .filter(User::is_patient)
            .ok_or_else(|| CareError::not_found("Patient not found"))?;
        self.insert(&patient, EventOrigin::System, input).await
    }

    async fn insert(&self, patient: &User, origin: EventOrigin, input: NewEvent) -> CareResult<Event> {
        let doctor_id = assigned_doctor(patient)?;
        if let Some(session_id) = input.related_session_id {
            let related = self.store.get_session(session_id).await?;
            if related.map(|s| s.patient_id) != Some(patient.id) {
                return Err(CareError::not_found("Related session not found"));
            }
        }

        let event = Event::new(patient.id, doctor_id, origin, input);
        self.store.insert_event(&event).await?;
        info!(
            "Recorded {:?} event {} for patient {} ({:?})",
            event.event_type, event.id, patient.id, origin
        );
        Ok(event)
    }

    /// Events of a patient, most recent first.
    pub async fn list(&self, who: &Principal, requested_patient: Option<Uuid>) -> CareResult<Vec<Event>> {
        let patient = patient_in_scope(self.store.as_ref(), who, requested_patient).await?;
        self.store.events_for_patient(patient.id).await
    }

    /// Closes an event. Only the owning doctor may resolve; resolving twice
    /// overwrites the notes.
    pub async fn resolve(
        &self,
        doctor: &Principal,
        event_id: Uuid,
        notes: Option<String>,
    ) -> CareResult<Event> {
        ensure_role(doctor, Role::Doctor)?;
        let mut event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| CareError::not_found("Event not found"))?;
        ensure_owner(&event, doctor, "event")?;

        event.resolve(doctor.id, notes, Utc::now());
        self.store.update_event(&event).await?;
        info!("Doctor {} resolved event {}", doctor.id, event.id);
        Ok(event)
    }
}
