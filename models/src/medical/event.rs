// models/src/medical/event.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Peritonitis,
    ExitSiteInfection,
    Hospitalization,
    TechniqueIssue,
    MissedDialysis,
    CloudyEffluent,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

/// Who recorded the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOrigin {
    Doctor,
    Patient,
    System,
}

impl From<Role> for EventOrigin {
    fn from(role: Role) -> Self {
        match role {
            Role::Doctor => EventOrigin::Doctor,
            Role::Patient => EventOrigin::Patient,
        }
    }
}

/// Caller-supplied part of an adverse event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub event_type: EventType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub severity: Severity,
    pub related_session_id: Option<Uuid>,
    pub event_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub event_type: EventType,
    pub description: String,
    pub severity: Severity,
    pub related_session_id: Option<Uuid>,
    pub event_date: DateTime<Utc>,
    pub resolved: bool,
    pub resolution_notes: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_by_role: EventOrigin,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(patient_id: Uuid, doctor_id: Uuid, origin: EventOrigin, input: NewEvent) -> Self {
        Event {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            event_type: input.event_type,
            description: input.description,
            severity: input.severity,
            related_session_id: input.related_session_id,
            event_date: input.event_date,
            resolved: false,
            resolution_notes: String::new(),
            resolved_at: None,
            resolved_by: None,
            created_by_role: origin,
            created_at: Utc::now(),
        }
    }

    /// Closes the event. Resolving an already resolved event overwrites the notes.
    pub fn resolve(&mut self, doctor_id: Uuid, notes: Option<String>, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolution_notes = notes.unwrap_or_default();
        self.resolved_at = Some(at);
        self.resolved_by = Some(doctor_id);
    }

    pub fn is_peritonitis(&self) -> bool {
        self.event_type == EventType::Peritonitis
    }
}
