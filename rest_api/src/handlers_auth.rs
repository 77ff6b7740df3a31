// rest_api/src/handlers_auth.rs

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use security::{login_user, register_user, UserLogin, UserRegistration};

use crate::errors::{ApiJson, ApiResult};
use crate::AppState;

// Handler for /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserRegistration>,
) -> ApiResult<Json<Value>> {
    let user_id = register_user(state.store.as_ref(), payload).await?;
    Ok(Json(json!({ "success": true, "userId": user_id })))
}

// Handler for /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserLogin>,
) -> ApiResult<Json<Value>> {
    let outcome = login_user(state.store.as_ref(), &state.authority, payload).await?;
    Ok(Json(json!({ "success": true, "token": outcome.token, "user": outcome.user })))
}
