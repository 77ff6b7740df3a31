// lib/src/evidence.rs

use std::sync::Arc;

use log::{error, info};
use uuid::Uuid;

use models::errors::{CareError, CareResult};
use models::medical::{Image, Principal};

use crate::access::ensure_owner;
use crate::object_storage::{ImageUpload, ObjectStorage};
use crate::storage_engine::CareStore;

/// Photographs attached to sessions by their owning doctor or patient.
#[derive(Clone)]
pub struct EvidenceStore {
    store: Arc<dyn CareStore>,
    objects: Arc<dyn ObjectStorage>,
}

impl EvidenceStore {
    pub fn new(store: Arc<dyn CareStore>, objects: Arc<dyn ObjectStorage>) -> Self {
        EvidenceStore { store, objects }
    }

    /// Stores the image with the object-storage collaborator, then records it.
    /// Nothing is recorded when the collaborator fails.
    pub async fn upload(
        &self,
        who: &Principal,
        session_id: Uuid,
        image: Option<ImageUpload>,
        tag: Option<String>,
    ) -> CareResult<Image> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| CareError::not_found("Session not found"))?;
        ensure_owner(&session, who, "session")?;

        let image = image.ok_or_else(|| CareError::invalid("Image file is required"))?;
        if image.bytes.is_empty() {
            return Err(CareError::invalid("Image file is required"));
        }
        if let Some(content_type) = &image.content_type {
            if !content_type.starts_with("image/") {
                return Err(CareError::invalid("Only image uploads are allowed"));
            }
        }

        let stored = self.objects.put_image(&image).await.map_err(|e| {
            error!("{} upload for session {} failed: {}", self.objects.provider_name(), session_id, e);
            e
        })?;

        let record = Image::new(session.id, who.role, who.id, stored.url, stored.public_id, tag);
        self.store.insert_image(&record).await?;
        info!(
            "{} {} uploaded image {} to session {}",
            who.role, who.id, record.id, session.id
        );
        Ok(record)
    }

    /// Every image of a session, whoever uploaded it.
    pub async fn list(&self, who: &Principal, session_id: Uuid) -> CareResult<Vec<Image>> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| CareError::not_found("Session not found"))?;
        ensure_owner(&session, who, "session")?;
        self.store.images_for_sessions(&[session.id]).await
    }
}
