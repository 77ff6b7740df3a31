// lib/src/object_storage/local.rs

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

use models::errors::{CareError, CareResult};

use super::{ImageUpload, ObjectStorage, StoredObject};

/// Writes images under a directory that the HTTP layer serves at `public_base_url`.
pub struct LocalDiskStorage {
    directory: PathBuf,
    public_base_url: String,
}

impl LocalDiskStorage {
    pub fn new(directory: PathBuf, public_base_url: String) -> Self {
        LocalDiskStorage {
            directory,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Keeps a short alphanumeric extension from the client's file name.
fn extension_of(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?.to_lowercase();
    if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

#[async_trait]
impl ObjectStorage for LocalDiskStorage {
    async fn put_image(&self, upload: &ImageUpload) -> CareResult<StoredObject> {
        let object_id = match extension_of(upload.file_name.as_deref()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CareError::ObjectStorage(format!("Cannot create upload directory: {}", e)))?;
        let path = self.directory.join(&object_id);
        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|e| CareError::ObjectStorage(format!("Cannot write {}: {}", path.display(), e)))?;
        debug!("Stored {} bytes at {}", upload.bytes.len(), path.display());

        Ok(StoredObject {
            url: format!("{}/{}", self.public_base_url, object_id),
            public_id: object_id,
        })
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
