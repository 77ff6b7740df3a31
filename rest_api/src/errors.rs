// rest_api/src/errors.rs

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use models::errors::CareError;
use security::{care_status, AuthError};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Care(#[from] CareError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),
    #[error("{}", .0.body_text())]
    Body(#[from] BytesRejection),
    #[error("Invalid multipart body: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

pub type ApiResult<T> = Result<T, RestApiError>;

impl RestApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestApiError::Care(err) => care_status(err),
            RestApiError::Auth(err) => err.status_code(),
            RestApiError::Json(_) | RestApiError::MultipartRejection(_) => StatusCode::BAD_REQUEST,
            RestApiError::Body(err) => err.status(),
            RestApiError::Multipart(err) => err.status(),
        }
    }
}

// Every failure leaves as `{ "message": ... }`. Server-side details stay in the log.
impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            match self {
                RestApiError::Care(CareError::ObjectStorage(_)) => "Image upload failed".to_string(),
                _ => "Server error".to_string(),
            }
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// `Json` whose rejections use the uniform error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

/// JSON body for routes where every field is optional. An empty body is the
/// default value; anything else must be valid JSON of the right shape.
#[derive(Debug)]
pub struct JsonOrEmpty<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrEmpty<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = RestApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonOrEmpty(T::default()));
        }
        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        Ok(JsonOrEmpty(value))
    }
}
