// rest_api/src/handlers_analytics.rs

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use lib::analytics::PatientSummary;
use models::errors::parse_required_id;
use security::Authenticated;

use crate::errors::{ApiJson, ApiResult};
use crate::handlers_sessions::PatientRequest;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: PatientSummary,
}

// Handler for POST /analytics/patient-summary
pub async fn patient_summary(
    State(state): State<AppState>,
    Authenticated(doctor): Authenticated,
    ApiJson(payload): ApiJson<PatientRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    let patient_id = parse_required_id("patientId", payload.patient_id.as_deref())?;
    let summary = state.analytics.patient_summary(&doctor, patient_id).await?;
    Ok(Json(SummaryResponse { success: true, summary }))
}
