// models/src/medical/image.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::Role;

pub const DEFAULT_IMAGE_TAG: &str = "general";

/// Photographic evidence attached to a session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Uuid,
    pub session_id: Uuid,
    pub uploaded_by: Role,
    pub uploader_id: Uuid,
    pub image_url: String,
    /// Object identifier assigned by the storage provider.
    pub public_id: String,
    pub tag: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Image {
    pub fn new(
        session_id: Uuid,
        uploaded_by: Role,
        uploader_id: Uuid,
        image_url: String,
        public_id: String,
        tag: Option<String>,
    ) -> Self {
        Image {
            id: Uuid::new_v4(),
            session_id,
            uploaded_by,
            uploader_id,
            image_url,
            public_id,
            tag: tag
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE_TAG.to_string()),
            uploaded_at: Utc::now(),
        }
    }

    pub fn view(&self) -> ImageView {
        ImageView {
            id: self.id,
            image_url: self.image_url.clone(),
            uploaded_at: self.uploaded_at,
            public_id: self.public_id.clone(),
        }
    }
}

/// Compact form used inside material summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: Uuid,
    pub image_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub public_id: String,
}
