// rest_api/src/tests.rs
//
// End-to-end tests: the full router on an ephemeral port, driven over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use uuid::Uuid;

use lib::object_storage::{ImageUpload, ObjectStorage, StoredObject};
use lib::storage_engine::InMemoryCareStore;
use models::errors::{CareError, CareResult};
use security::TokenAuthority;

use crate::config::AppConfig;
use crate::{build_router, AppState};

/// Remembers what was uploaded; fails every call when `fail` is set.
struct RecordingStorage {
    fail: bool,
    uploads: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put_image(&self, upload: &ImageUpload) -> CareResult<StoredObject> {
        if self.fail {
            return Err(CareError::ObjectStorage("provider unavailable".into()));
        }
        let mut uploads = self.uploads.lock().await;
        uploads.push(upload.file_name.clone());
        let n = uploads.len();
        Ok(StoredObject {
            url: format!("https://cdn.test/dialysis_app/{}.jpg", n),
            public_id: format!("dialysis_app/{}", n),
        })
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

struct TestApp {
    base: String,
    client: Client,
    storage: Arc<RecordingStorage>,
}

struct Clinic {
    app: TestApp,
    doctor_id: String,
    doctor_token: String,
    patient_id: String,
    patient_token: String,
}

impl TestApp {
    async fn spawn(fail_uploads: bool) -> Self {
        let storage = Arc::new(RecordingStorage {
            fail: fail_uploads,
            uploads: Mutex::new(Vec::new()),
        });
        let state = AppState::new(
            Arc::new(InMemoryCareStore::new()),
            storage.clone(),
            Arc::new(TokenAuthority::new("integration-secret", 8)),
        );
        let mut config = AppConfig::default();
        config.images.provider = "cloudinary".to_string();
        let app = build_router(state, &config).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });

        TestApp {
            base: format!("http://{}", addr),
            client: Client::new(),
            storage,
        }
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base, path))
            .json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, token, body).await
    }

    async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::PATCH, path, token, body).await
    }

    async fn post_raw(&self, path: &str, token: &str, body: &'static str) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base, path))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn register(&self, role: &str, email: &str, doctor_id: Option<&str>) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({ "name": email, "email": email, "password": "pw-123", "role": role, "doctorId": doctor_id }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        body["userId"].as_str().unwrap().to_string()
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post("/api/auth/login", None, json!({ "email": email, "password": "pw-123" }))
            .await;
        assert_eq!(status, 200, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: &str, session_id: &str, content_type: &str) -> (u16, Value) {
        let part = Part::bytes(b"fake image bytes".to_vec())
            .file_name("bag.jpg")
            .mime_str(content_type)
            .unwrap();
        let form = Form::new()
            .text("sessionId", session_id.to_string())
            .text("tag", "material")
            .part("image", part);
        let response = self
            .client
            .post(format!("{}/api/upload/upload", self.base))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

impl Clinic {
    async fn open(fail_uploads: bool) -> Self {
        let app = TestApp::spawn(fail_uploads).await;
        let doctor_id = app.register("doctor", "house@clinic.test", None).await;
        let patient_id = app
            .register("patient", "pat@clinic.test", Some(&doctor_id))
            .await;
        let doctor_token = app.login("house@clinic.test").await;
        let patient_token = app.login("pat@clinic.test").await;
        Clinic { app, doctor_id, doctor_token, patient_id, patient_token }
    }

    async fn material_session(&self, sessions_count: u32) -> String {
        let (status, body) = self
            .app
            .post(
                "/api/upload/start-material-session",
                Some(&self.doctor_token),
                json!({
                    "patientId": self.patient_id,
                    "sessionsCount": sessions_count,
                    "dialysisMachine": "portable",
                    "dialyzer": true,
                    "notes": "first kit",
                }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["session"]["type"], "material");
        body["session"]["id"].as_str().unwrap().to_string()
    }

    async fn start_dialysis(&self, material_id: &str) -> (u16, Value) {
        self.app
            .post(
                "/api/upload/start-dialysis-session",
                Some(&self.patient_token),
                json!({ "materialSessionId": material_id }),
            )
            .await
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn(false).await;
    let response = app.client.get(format!("{}/api/health", app.base)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn registration_and_login_rules() {
    let app = TestApp::spawn(false).await;
    let doctor_id = app.register("doctor", "Doc@Clinic.test", None).await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "Again", "email": "doc@clinic.test", "password": "x", "role": "doctor" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "name": "P", "email": "p@clinic.test", "password": "x", "role": "patient" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Patient must have doctorId");

    app.register("patient", "p@clinic.test", Some(&doctor_id)).await;
    let (status, body) = app
        .post("/api/auth/login", None, json!({ "email": "p@clinic.test", "password": "pw-123" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["token"].as_str().is_some());

    let (wrong_status, wrong_password) = app
        .post("/api/auth/login", None, json!({ "email": "p@clinic.test", "password": "nope" }))
        .await;
    let (unknown_status, unknown_email) = app
        .post("/api/auth/login", None, json!({ "email": "ghost@clinic.test", "password": "nope" }))
        .await;
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

#[tokio::test]
async fn auth_gate_rejects_missing_malformed_and_wrong_role() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;
    let path = "/api/upload/start-material-session";
    let body = json!({ "patientId": clinic.patient_id });

    let (status, reply) = app.post(path, None, body.clone()).await;
    assert_eq!(status, 401);
    assert_eq!(reply["message"], "Missing auth header");

    let response = app
        .client
        .post(format!("{}{}", app.base, path))
        .header("Authorization", "Bearer")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let (status, _) = app.post(path, Some("not.a.token"), body.clone()).await;
    assert_eq!(status, 401);

    let (status, reply) = app.post(path, Some(&clinic.patient_token), body).await;
    assert_eq!(status, 403);
    assert_eq!(reply["message"], "Forbidden: insufficient role");
}

#[tokio::test]
async fn malformed_json_uses_the_error_envelope() {
    let app = TestApp::spawn(false).await;
    let response = app
        .client
        .post(format!("{}/api/auth/login", app.base))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn allotment_counts_completed_and_verified_sessions() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;
    let material_id = clinic.material_session(3).await;

    let (status, body) = app
        .patch(
            "/api/upload/acknowledge-material-session",
            Some(&clinic.patient_token),
            json!({ "sessionId": material_id }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["session"]["status"], "acknowledged");

    let mut dialysis_ids = Vec::new();
    for _ in 0..3 {
        let (status, body) = clinic.start_dialysis(&material_id).await;
        assert_eq!(status, 200, "{}", body);
        let id = body["session"]["id"].as_str().unwrap().to_string();

        let (status, _) = clinic.start_dialysis(&material_id).await;
        assert_eq!(status, 400, "a second active session must be refused");

        let (status, body) = app
            .patch(
                "/api/upload/finish-dialysis-session",
                Some(&clinic.patient_token),
                json!({ "sessionId": id, "feelingOk": true, "fillVolume": 2000.0, "bloodPressure": "120/80" }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["session"]["status"], "completed");
        dialysis_ids.push(id);
    }

    for id in &dialysis_ids[..2] {
        let (status, body) = app
            .patch(
                "/api/upload/verify-dialysis-session",
                Some(&clinic.doctor_token),
                json!({ "sessionId": id, "verificationNotes": "looks fine" }),
            )
            .await;
        assert_eq!(status, 200, "{}", body);
        assert_eq!(body["session"]["status"], "verified");
    }

    let (status, body) = clinic.start_dialysis(&material_id).await;
    assert_eq!(status, 400);
    assert_eq!(
        body["message"],
        "All dialysis sessions for this material pack are exhausted. Please collect new material."
    );

    let (status, body) = app
        .post(
            "/api/upload/patient/material-summary",
            Some(&clinic.doctor_token),
            json!({ "patientId": clinic.patient_id }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    let block = &body["materialSessions"][0];
    assert_eq!(block["totalSessionsAllowed"], 3);
    assert_eq!(block["completedSessions"], 3);
    assert_eq!(block["remainingSessions"], 0);
    assert_eq!(block["dialysisSessions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn foreign_doctor_cannot_touch_the_patient() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;
    let material_id = clinic.material_session(1).await;

    app.register("doctor", "other@clinic.test", None).await;
    let other_token = app.login("other@clinic.test").await;

    let (status, _) = app
        .post(
            "/api/upload/start-material-session",
            Some(&other_token),
            json!({ "patientId": clinic.patient_id, "sessionsCount": 2 }),
        )
        .await;
    assert!(status == 403 || status == 404, "got {}", status);

    let (status, _) = app.upload(&other_token, &material_id, "image/jpeg").await;
    assert_eq!(status, 403);

    let (status, body) = app
        .post(
            "/api/upload/doctor/patients",
            Some(&other_token),
            json!({ "doctorId": clinic.doctor_id }),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["message"], "Unauthorized access");

    let (status, body) = app
        .post(
            "/api/upload/doctor/patients",
            Some(&clinic.doctor_token),
            json!({ "doctorId": clinic.doctor_id }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 1);
    assert_eq!(body["patients"][0]["id"], clinic.patient_id.as_str());
}

#[tokio::test]
async fn uploaded_images_are_listed_with_provider_urls() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;
    let material_id = clinic.material_session(2).await;

    let (status, body) = app.upload(&clinic.doctor_token, &material_id, "image/jpeg").await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["image"]["imageUrl"], "https://cdn.test/dialysis_app/1.jpg");
    assert_eq!(body["image"]["publicId"], "dialysis_app/1");
    assert_eq!(body["image"]["tag"], "material");
    assert_eq!(app.storage.uploads.lock().await.len(), 1);

    let (status, body) = app.upload(&clinic.doctor_token, &material_id, "text/plain").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Only image uploads are allowed");

    let response = app
        .client
        .get(format!("{}/api/upload/session/{}/images", app.base, material_id))
        .bearer_auth(&clinic.patient_token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["uploadedBy"], "doctor");

    let (status, _) = app
        .upload(&clinic.doctor_token, &Uuid::new_v4().to_string(), "image/jpeg")
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn failed_provider_upload_records_nothing() {
    let clinic = Clinic::open(true).await;
    let app = &clinic.app;
    let material_id = clinic.material_session(2).await;

    let (status, body) = app.upload(&clinic.doctor_token, &material_id, "image/png").await;
    assert_eq!(status, 500);
    assert_eq!(body["message"], "Image upload failed");

    let response = app
        .client
        .get(format!("{}/api/upload/session/{}/images", app.base, material_id))
        .bearer_auth(&clinic.doctor_token)
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert!(body["images"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn patient_events_are_bound_to_the_caller_and_counted() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;

    let (status, body) = app
        .post(
            "/api/upload/events",
            Some(&clinic.patient_token),
            json!({
                "patientId": Uuid::new_v4().to_string(),
                "eventType": "peritonitis",
                "severity": "severe",
                "description": "cloudy bag and fever",
                "eventDate": "2026-03-01T08:00:00Z",
            }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["event"]["patientId"], clinic.patient_id.as_str());
    assert_eq!(body["event"]["doctorId"], clinic.doctor_id.as_str());
    let event_id = body["event"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .patch(
            "/api/upload/events/resolve",
            Some(&clinic.patient_token),
            json!({ "eventId": event_id }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = app
        .patch(
            "/api/upload/events/resolve",
            Some(&clinic.doctor_token),
            json!({ "eventId": event_id, "resolutionNotes": "antibiotics given" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["event"]["resolved"], true);

    let (status, body) = app
        .post(
            "/api/upload/analytics/patient-summary",
            Some(&clinic.doctor_token),
            json!({ "patientId": clinic.patient_id }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalEvents"], 1);
    assert_eq!(body["peritonitisEpisodes"], 1);
    assert_eq!(body["unresolvedEvents"], 0);
    assert_eq!(body["totalDialysisSessions"], 0);
}

#[tokio::test]
async fn medical_profile_is_written_by_doctor_and_read_by_patient() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;

    let (status, _) = app
        .post("/api/upload/medical-profile", Some(&clinic.patient_token), json!({}))
        .await;
    assert_eq!(status, 404);

    let (status, body) = app
        .send(
            reqwest::Method::PUT,
            "/api/upload/medical-profile",
            Some(&clinic.doctor_token),
            json!({ "patientId": clinic.patient_id }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);

    let (status, _) = app
        .send(
            reqwest::Method::PUT,
            "/api/upload/medical-profile",
            Some(&clinic.patient_token),
            json!({ "patientId": clinic.patient_id }),
        )
        .await;
    assert_eq!(status, 403);

    let (status, body) = app
        .post("/api/upload/medical-profile", Some(&clinic.patient_token), json!({}))
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["profile"]["patientId"], clinic.patient_id.as_str());
}

#[tokio::test]
async fn form_style_values_are_accepted_for_kits_and_reports() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;

    let (status, body) = app
        .post(
            "/api/upload/start-material-session",
            Some(&clinic.doctor_token),
            json!({
                "patientId": clinic.patient_id,
                "sessionsCount": "3",
                "dialysisMachine": null,
                "dialyzer": "true",
            }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["session"]["materials"]["sessionsCount"], 3);
    assert_eq!(body["session"]["materials"]["dialysisMachine"], "none");
    assert_eq!(body["session"]["materials"]["dialyzer"], true);
    let material_id = body["session"]["id"].as_str().unwrap().to_string();

    let (status, body) = clinic.start_dialysis(&material_id).await;
    assert_eq!(status, 200, "{}", body);
    let dialysis_id = body["session"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .patch(
            "/api/upload/finish-dialysis-session",
            Some(&clinic.patient_token),
            json!({ "sessionId": dialysis_id, "fillVolume": "2000", "feelingOk": "yes" }),
        )
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["session"]["parameters"]["dialysis"]["fillVolume"], 2000.0);
    assert_eq!(body["session"]["parameters"]["voluntary"]["feelingOk"], true);
}

#[tokio::test]
async fn optional_read_bodies_must_still_be_valid_json() {
    let clinic = Clinic::open(false).await;
    let app = &clinic.app;

    let (status, body) = app
        .post_raw("/api/upload/events/list", &clinic.patient_token, "{not json")
        .await;
    assert_eq!(status, 400, "{}", body);
    assert!(body["message"].as_str().is_some());

    let (status, body) = app
        .post_raw("/api/upload/events/list", &clinic.doctor_token, r#"{"patientId": 42}"#)
        .await;
    assert_eq!(status, 400, "{}", body);
    assert!(body["message"].as_str().unwrap().contains("patientId"), "{}", body);

    let (status, body) = app
        .post_raw("/api/upload/events/list", &clinic.patient_token, "")
        .await;
    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["count"], 0);
}
