// rest_api/src/handlers_clinical.rs

use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use models::errors::{parse_optional_id, parse_required_id};
use models::medical::{BaselineDetails, FollowUpDetails, ProfileDetails};
use security::Authenticated;

use crate::errors::{ApiJson, ApiResult, JsonOrEmpty};
use crate::handlers_sessions::PatientRequest;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpsertRequest {
    pub patient_id: Option<String>,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineUpsertRequest {
    pub patient_id: Option<String>,
    #[serde(flatten)]
    pub details: BaselineDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpUpsertRequest {
    pub patient_id: Option<String>,
    pub visit_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub details: FollowUpDetails,
}

fn requested_patient(payload: &PatientRequest) -> ApiResult<Option<uuid::Uuid>> {
    Ok(parse_optional_id("patientId", payload.patient_id.as_deref())?)
}

// Handler for PUT /medical-profile
pub async fn upsert_medical_profile(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<ProfileUpsertRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let profile = state
        .clinical
        .upsert_profile(&doctor, patient_id, payload.details)
        .await?;
    info!(patient = %patient_id, "medical profile saved");
    Ok(Json(json!({ "success": true, "profile": profile })))
}

// Handler for POST /medical-profile
pub async fn medical_profile(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    JsonOrEmpty(payload): JsonOrEmpty<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let profile = state.clinical.profile(&who, requested_patient(&payload)?).await?;
    Ok(Json(json!({ "success": true, "profile": profile })))
}

// Handler for PUT /baseline-assessment
pub async fn upsert_baseline_assessment(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<BaselineUpsertRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let assessment = state
        .clinical
        .upsert_baseline(&doctor, patient_id, payload.details)
        .await?;
    info!(patient = %patient_id, "baseline assessment saved");
    Ok(Json(json!({ "success": true, "assessment": assessment })))
}

// Handler for POST /baseline-assessment
pub async fn baseline_assessment(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    JsonOrEmpty(payload): JsonOrEmpty<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let assessment = state.clinical.baseline(&who, requested_patient(&payload)?).await?;
    Ok(Json(json!({ "success": true, "assessment": assessment })))
}

// Handler for PUT /followup-assessment
pub async fn upsert_followup_assessment(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<FollowUpUpsertRequest>,
) -> ApiResult<Json<Value>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let assessment = state
        .clinical
        .upsert_followup(&doctor, patient_id, payload.visit_date, payload.details)
        .await?;
    info!(patient = %patient_id, visit = %assessment.visit_date, "follow-up assessment saved");
    Ok(Json(json!({ "success": true, "assessment": assessment })))
}

// Handler for POST /followup-assessments
pub async fn followup_assessments(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    JsonOrEmpty(payload): JsonOrEmpty<PatientRequest>,
) -> ApiResult<Json<Value>> {
    let assessments = state.clinical.followups(&who, requested_patient(&payload)?).await?;
    Ok(Json(json!({ "success": true, "count": assessments.len(), "assessments": assessments })))
}
