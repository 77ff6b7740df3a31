// rest_api/src/handlers_events.rs

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use models::errors::{parse_optional_id, parse_required_id};
use models::medical::NewEvent;
use security::Authenticated;

use crate::errors::{ApiJson, ApiResult, JsonOrEmpty};
use crate::handlers_sessions::PatientRequest;
use crate::AppState;

/// `patientId` is only read for doctors; a patient always reports for themself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    pub patient_id: Option<String>,
    #[serde(flatten)]
    pub event: NewEvent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveEventRequest {
    pub event_id: Option<String>,
    pub resolution_notes: Option<String>,
}

// Handler for POST /events
pub async fn record_event(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    ApiJson(payload): ApiJson<RecordEventRequest>,
) -> ApiResult<Json<Value>> {
    let requested = if who.is_doctor() {
        parse_optional_id("patientId", payload.patient_id.as_deref())?
    } else {
        None
    };
    let event = state.events.record(&who, requested, payload.event).await?;
    info!(event = %event.id, patient = %event.patient_id, "event recorded");
    Ok(Json(json!({ "success": true, "event": event })))
}

// Handler for POST /events/list
pub async fn list_events(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    JsonOrEmpty(payload): JsonOrEmpty<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_optional_id("patientId", payload.patient_id.as_deref())?;
    let events = state.events.list(&who, patient_id).await?;
    Ok(Json(json!({ "success": true, "count": events.len(), "events": events })))
}

// Handler for PATCH /events/resolve
pub async fn resolve_event(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<ResolveEventRequest>,
) -> ApiResult<Json<Value>> {
    let event_id = parse_required_id("eventId", payload.event_id.as_deref())?;
    let event = state
        .events
        .resolve(&doctor, event_id, payload.resolution_notes)
        .await?;
    info!(event = %event.id, doctor = %doctor.id, "event resolved");
    Ok(Json(json!({ "success": true, "event": event })))
}
