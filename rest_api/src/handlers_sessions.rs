// rest_api/src/handlers_sessions.rs
//
// Material issuance, dialysis lifecycle and the patient-facing summaries.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use models::errors::{parse_optional_id, parse_required_id};
use models::medical::{DialysisReport, ExchangeParameters, MaterialKit, SelfReport};
use security::Authenticated;

use crate::errors::{ApiJson, ApiResult, JsonOrEmpty};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMaterialRequest {
    pub patient_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub materials: MaterialKit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDialysisRequest {
    pub material_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdRequest {
    pub session_id: Option<String>,
}

/// The self-report arrives flat, next to `sessionId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishDialysisRequest {
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub voluntary: SelfReport,
    #[serde(flatten)]
    pub dialysis: ExchangeParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDialysisRequest {
    pub session_id: Option<String>,
    pub verification_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatientRequest {
    pub patient_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatientsRequest {
    pub doctor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDetailsRequest {
    pub patient_id: Option<String>,
    pub material_session_id: Option<String>,
}

// Handler for POST /start-material-session
pub async fn start_material_session(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<StartMaterialRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let session = state
        .ledger
        .create_material_session(&doctor, patient_id, payload.materials, payload.notes)
        .await?;
    Ok(Json(json!({ "success": true, "session": session })))
}

// Handler for POST /start-dialysis-session
pub async fn start_dialysis_session(
    State(state): State<AppState>,
    Authenticated(patient): Authenticated,
    ApiJson(payload): ApiJson<StartDialysisRequest>,
) -> ApiResult<Json<Value>> {
    let material_id = parse_required_id("materialSessionId", payload.material_session_id.as_deref())?;
    let session = state.ledger.start_dialysis_session(&patient, material_id).await?;
    Ok(Json(json!({ "success": true, "session": session })))
}

// Handler for PATCH /finish-dialysis-session
pub async fn finish_dialysis_session(
    State(state): State<AppState>,
    Authenticated(patient): Authenticated,
    ApiJson(payload): ApiJson<FinishDialysisRequest>,
) -> ApiResult<Json<Value>> {
    let session_id = parse_required_id("sessionId", payload.session_id.as_deref())?;
    let report = DialysisReport {
        voluntary: payload.voluntary,
        dialysis: payload.dialysis,
    };
    let session = state
        .ledger
        .finish_dialysis_session(&patient, session_id, report)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Dialysis session marked as completed",
        "session": session,
    })))
}

// Handler for PATCH /verify-dialysis-session
pub async fn verify_dialysis_session(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<VerifyDialysisRequest>,
) -> ApiResult<Json<Value>> {
    let session_id = parse_required_id("sessionId", payload.session_id.as_deref())?;
    let session = state
        .ledger
        .verify_dialysis_session(&doctor, session_id, payload.verification_notes)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Dialysis session verified successfully",
        "session": session,
    })))
}

// Handler for PATCH /acknowledge-material-session
pub async fn acknowledge_material_session(
    State(state): State<AppState>,
    Authenticated(patient): Authenticated,
    ApiJson(payload): ApiJson<SessionIdRequest>,
) -> ApiResult<Json<Value>> {
    let session_id = parse_required_id("sessionId", payload.session_id.as_deref())?;
    let session = state
        .ledger
        .acknowledge_material_session(&patient, session_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Material receipt acknowledged by patient",
        "session": session,
    })))
}

// Handler for POST /doctor/patients
pub async fn doctor_patients(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<DoctorPatientsRequest>,
) -> ApiResult<Json<Value>> {
    let doctor_id = parse_required_id("doctorId", payload.doctor_id.as_deref())?;
    let patients = state.directory.patients_of(&doctor, doctor_id).await?;
    info!(doctor = %doctor.id, count = patients.len(), "listed patients");
    Ok(Json(json!({ "success": true, "count": patients.len(), "patients": patients })))
}

// Handler for POST /patient/details
pub async fn patient_details(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    ApiJson(payload): ApiJson<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let patient = state.directory.patient_details(&who, patient_id).await?;
    Ok(Json(json!({ "success": true, "patient": patient })))
}

// Handler for POST /patient/material-summary
pub async fn material_summary(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    JsonOrEmpty(payload): JsonOrEmpty<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_optional_id("patientId", payload.patient_id.as_deref())?;
    let summary = state.ledger.material_summary(&who, patient_id).await?;
    Ok(Json(json!({
        "success": true,
        "patient": summary.patient,
        "materialSessions": summary.material_sessions,
    })))
}

// Handler for POST /material/session-details
pub async fn material_session_details(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    ApiJson(payload): ApiJson<MaterialDetailsRequest>,
) -> ApiResult<Json<Value>> {
    let material_id = parse_required_id("materialSessionId", payload.material_session_id.as_deref())?;
    let patient_id = parse_optional_id("patientId", payload.patient_id.as_deref())?;
    let details = state
        .ledger
        .material_session_details(&who, patient_id, material_id)
        .await?;
    Ok(Json(json!({ "success": true, "materialSession": details })))
}
