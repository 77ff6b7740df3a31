// rest_api/src/lib.rs
//
// HTTP surface of the home-dialysis care service.

pub mod config;
pub mod errors;
mod handlers_analytics;
mod handlers_auth;
mod handlers_clinical;
mod handlers_events;
mod handlers_images;
mod handlers_sessions;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::routing::{get, patch, post, put, MethodRouter};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use lib::analytics::Analytics;
use lib::clinical::ClinicalRecords;
use lib::directory::Directory;
use lib::events::EventLog;
use lib::evidence::EvidenceStore;
use lib::ledger::SessionLedger;
use lib::object_storage::{build_object_storage, ImageProvider, ObjectStorage};
use lib::{open_care_store, CareStore};
use security::{require_auth, AllowedRoles, AuthGate, TokenAuthority};

use crate::config::AppConfig;

/// Shared handler state. Every service holds the same store handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CareStore>,
    pub authority: Arc<TokenAuthority>,
    pub ledger: SessionLedger,
    pub directory: Directory,
    pub evidence: EvidenceStore,
    pub clinical: ClinicalRecords,
    pub events: EventLog,
    pub analytics: Analytics,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CareStore>,
        objects: Arc<dyn ObjectStorage>,
        authority: Arc<TokenAuthority>,
    ) -> Self {
        AppState {
            ledger: SessionLedger::new(store.clone()),
            directory: Directory::new(store.clone()),
            evidence: EvidenceStore::new(store.clone(), objects),
            clinical: ClinicalRecords::new(store.clone()),
            events: EventLog::new(store.clone()),
            analytics: Analytics::new(store.clone()),
            authority,
            store,
        }
    }
}

// Handler for /api/health
async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

fn gated(
    route: MethodRouter<AppState>,
    authority: &Arc<TokenAuthority>,
    allowed: AllowedRoles,
) -> MethodRouter<AppState> {
    let gate = AuthGate::new(authority.clone(), allowed);
    route.layer(middleware::from_fn_with_state(gate, require_auth))
}

fn care_routes(authority: &Arc<TokenAuthority>) -> Router<AppState> {
    use AllowedRoles as R;
    let a = authority;

    Router::new()
        .route(
            "/start-material-session",
            gated(post(handlers_sessions::start_material_session), a, R::DOCTOR),
        )
        .route(
            "/start-dialysis-session",
            gated(post(handlers_sessions::start_dialysis_session), a, R::PATIENT),
        )
        .route(
            "/finish-dialysis-session",
            gated(patch(handlers_sessions::finish_dialysis_session), a, R::PATIENT),
        )
        .route(
            "/verify-dialysis-session",
            gated(patch(handlers_sessions::verify_dialysis_session), a, R::DOCTOR),
        )
        .route(
            "/acknowledge-material-session",
            gated(patch(handlers_sessions::acknowledge_material_session), a, R::PATIENT),
        )
        .route(
            "/doctor/patients",
            gated(post(handlers_sessions::doctor_patients), a, R::DOCTOR),
        )
        .route(
            "/patient/details",
            gated(post(handlers_sessions::patient_details), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/patient/material-summary",
            gated(post(handlers_sessions::material_summary), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/material/session-details",
            gated(post(handlers_sessions::material_session_details), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/upload",
            gated(post(handlers_images::upload_image), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/session/:id/images",
            gated(get(handlers_images::session_images), a, R::ANY),
        )
        .route(
            "/medical-profile",
            gated(put(handlers_clinical::upsert_medical_profile), a, R::DOCTOR)
                .merge(gated(post(handlers_clinical::medical_profile), a, R::DOCTOR_OR_PATIENT)),
        )
        .route(
            "/baseline-assessment",
            gated(put(handlers_clinical::upsert_baseline_assessment), a, R::DOCTOR)
                .merge(gated(post(handlers_clinical::baseline_assessment), a, R::DOCTOR_OR_PATIENT)),
        )
        .route(
            "/followup-assessment",
            gated(put(handlers_clinical::upsert_followup_assessment), a, R::DOCTOR),
        )
        .route(
            "/followup-assessments",
            gated(post(handlers_clinical::followup_assessments), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/events",
            gated(post(handlers_events::record_event), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/events/list",
            gated(post(handlers_events::list_events), a, R::DOCTOR_OR_PATIENT),
        )
        .route(
            "/events/resolve",
            gated(patch(handlers_events::resolve_event), a, R::DOCTOR),
        )
        .route(
            "/analytics/patient-summary",
            gated(post(handlers_analytics::patient_summary), a, R::DOCTOR),
        )
}

fn cors_layer(config: &AppConfig) -> anyhow::Result<CorsLayer> {
    let origins = config
        .server
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true))
}

/// Builds the complete router: `/api/auth`, `/api/upload`, `/api/health` and,
/// for local image storage, the `/uploads` file server.
pub fn build_router(state: AppState, config: &AppConfig) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/register", post(handlers_auth::register))
        .route("/login", post(handlers_auth::login));

    let mut app = Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/auth", auth_routes)
        .nest("/api/upload", care_routes(&state.authority));

    if config.image_config()?.provider == ImageProvider::Local {
        app = app.nest_service("/uploads", ServeDir::new(&config.images.local_directory));
    }

    Ok(app
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(cors_layer(config)?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal.");
}

/// Opens storage, builds the router and serves until Ctrl-C.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let store = open_care_store(&config.storage_config()?)
        .context("Failed to open care store")?;
    let objects = build_object_storage(&config.image_config()?)
        .context("Failed to configure image storage")?;
    let authority = Arc::new(TokenAuthority::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_hours,
    ));

    let state = AppState::new(store, objects.clone(), authority);
    let app = build_router(state, &config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    info!(
        "Home care API listening on {} (storage: {}, images: {})",
        addr,
        config.storage.engine,
        objects.provider_name()
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST API server failed to start or run")?;

    info!("Home care API stopped.");
    Ok(())
}
