// lib/src/object_storage/cloudinary.rs

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use models::errors::{CareError, CareResult};

use super::{ImageUpload, ObjectStorage, StoredObject};

/// Unsigned-preset uploads to Cloudinary's image upload endpoint.
pub struct CloudinaryStorage {
    client: Client,
    upload_url: String,
    upload_preset: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<UploadError>,
}

#[derive(Debug, Deserialize)]
struct UploadError {
    message: String,
}

impl CloudinaryStorage {
    pub fn new(api_base: &str, cloud_name: &str, upload_preset: &str, folder: &str) -> CareResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CareError::ObjectStorage(format!("Failed to build HTTP client: {}", e)))?;
        Ok(CloudinaryStorage {
            client,
            upload_url: format!(
                "{}/v1_1/{}/image/upload",
                api_base.trim_end_matches('/'),
                cloud_name
            ),
            upload_preset: upload_preset.to_string(),
            folder: folder.to_string(),
        })
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }
}

fn parse_upload_response(body: &str) -> CareResult<StoredObject> {
    let parsed: UploadResponse = serde_json::from_str(body)
        .map_err(|e| CareError::ObjectStorage(format!("Unreadable upload response: {}", e)))?;
    if let Some(err) = parsed.error {
        return Err(CareError::ObjectStorage(err.message));
    }
    match (parsed.secure_url, parsed.public_id) {
        (Some(url), Some(public_id)) => Ok(StoredObject { url, public_id }),
        _ => Err(CareError::ObjectStorage(
            "Upload response is missing secure_url or public_id".to_string(),
        )),
    }
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn put_image(&self, upload: &ImageUpload) -> CareResult<StoredObject> {
        let mut part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone().unwrap_or_else(|| "upload".to_string()));
        if let Some(content_type) = &upload.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| CareError::invalid(format!("Invalid content type: {}", e)))?;
        }
        let form = Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", self.folder.clone())
            .part("file", part);

        debug!("Uploading {} bytes to {}", upload.bytes.len(), self.upload_url);
        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CareError::ObjectStorage(format!("Cloudinary upload failed: {}", e)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CareError::ObjectStorage(format!("Cloudinary upload failed: {}", e)))?;

        if !status.is_success() {
            error!("Cloudinary rejected upload with {}: {}", status, body);
            return Err(parse_upload_response(&body).err().unwrap_or_else(|| {
                CareError::ObjectStorage(format!("Cloudinary upload failed with status {}", status))
            }));
        }
        parse_upload_response(&body)
    }

    fn provider_name(&self) -> &'static str {
        "cloudinary"
    }
}
