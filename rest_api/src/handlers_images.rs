// rest_api/src/handlers_images.rs

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use lib::object_storage::ImageUpload;
use models::errors::parse_required_id;
use security::Authenticated;

use crate::errors::{ApiResult, RestApiError};
use crate::AppState;

/// Fields of the upload form. Unknown fields are drained and ignored.
#[derive(Debug, Default)]
struct UploadForm {
    session_id: Option<String>,
    image: Option<ImageUpload>,
    tag: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, RestApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("sessionId") => form.session_id = Some(field.text().await?),
            Some("tag") => form.tag = Some(field.text().await?),
            Some("image") => {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                form.image = Some(ImageUpload { file_name, content_type, bytes });
            }
            _ => {
                field.bytes().await?;
            }
        }
    }
    Ok(form)
}

// Handler for POST /upload
pub async fn upload_image(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let form = read_upload_form(multipart).await?;
    let session_id = parse_required_id("sessionId", form.session_id.as_deref())?;
    let tag = form.tag.filter(|t| !t.trim().is_empty());

    let image = state.evidence.upload(&who, session_id, form.image, tag).await?;
    info!(image = %image.id, session = %session_id, "image stored");
    Ok(Json(json!({ "success": true, "image": image })))
}

// Handler for GET /session/:id/images
pub async fn session_images(
    State(state): State<AppState>,
    Authenticated(who): Authenticated,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let session_id = parse_required_id("sessionId", Some(&session_id))?;
    let images = state.evidence.list(&who, session_id).await?;
    Ok(Json(json!({ "success": true, "images": images })))
}
