// lib/src/analytics.rs

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use models::errors::CareResult;
use models::medical::{Principal, Role, Session};

use crate::access::{assigned_patient, ensure_role};
use crate::storage_engine::CareStore;

/// Counts for one patient, computed fresh on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient_id: Uuid,
    pub total_dialysis_sessions: usize,
    pub total_events: usize,
    pub peritonitis_episodes: usize,
    pub unresolved_events: usize,
}

#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn CareStore>,
}

impl Analytics {
    pub fn new(store: Arc<dyn CareStore>) -> Self {
        Analytics { store }
    }

    pub async fn patient_summary(&self, doctor: &Principal, patient_id: Uuid) -> CareResult<PatientSummary> {
        ensure_role(doctor, Role::Doctor)?;
        let patient = assigned_patient(self.store.as_ref(), doctor.id, patient_id).await?;

        let sessions = self.store.sessions_for_patient(patient.id).await?;
        let events = self.store.events_for_patient(patient.id).await?;

        Ok(PatientSummary {
            patient_id: patient.id,
            total_dialysis_sessions: sessions
                .iter()
                .filter_map(Session::as_dialysis)
                .filter(|d| d.status.consumes_allotment())
                .count(),
            total_events: events.len(),
            peritonitis_episodes: events.iter().filter(|e| e.is_peritonitis()).count(),
            unresolved_events: events.iter().filter(|e| !e.resolved).count(),
        })
    }
}
