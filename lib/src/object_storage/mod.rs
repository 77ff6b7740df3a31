// lib/src/object_storage/mod.rs
//
// Binary storage for uploaded images. The evidence store only keeps the URL
// and object id handed back by one of these collaborators.

pub mod cloudinary;
pub mod local;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::info;

use models::errors::{CareError, CareResult};

pub use cloudinary::CloudinaryStorage;
pub use local::LocalDiskStorage;

/// An image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Where the provider put the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    async fn put_image(&self, upload: &ImageUpload) -> CareResult<StoredObject>;
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageProvider {
    #[default]
    Local,
    Cloudinary,
}

impl FromStr for ImageProvider {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(ImageProvider::Local),
            "cloudinary" => Ok(ImageProvider::Cloudinary),
            other => Err(CareError::invalid(format!("Unknown image provider: {}", other))),
        }
    }
}

impl fmt::Display for ImageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageProvider::Local => write!(f, "local"),
            ImageProvider::Cloudinary => write!(f, "cloudinary"),
        }
    }
}

pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";
pub const DEFAULT_IMAGE_FOLDER: &str = "dialysis_app";

#[derive(Debug, Clone)]
pub struct ImageStorageConfig {
    pub provider: ImageProvider,
    pub local_directory: PathBuf,
    pub public_base_url: String,
    pub cloudinary_api_base: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub folder: String,
}

impl Default for ImageStorageConfig {
    fn default() -> Self {
        ImageStorageConfig {
            provider: ImageProvider::Local,
            local_directory: PathBuf::from("./data/uploads"),
            public_base_url: "http://localhost:5000/uploads".to_string(),
            cloudinary_api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            folder: DEFAULT_IMAGE_FOLDER.to_string(),
        }
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> CareResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CareError::invalid(format!("images.{} is required for cloudinary", name)))
}

/// Builds the collaborator selected by `config`.
pub fn build_object_storage(config: &ImageStorageConfig) -> CareResult<Arc<dyn ObjectStorage>> {
    let storage: Arc<dyn ObjectStorage> = match config.provider {
        ImageProvider::Local => Arc::new(LocalDiskStorage::new(
            config.local_directory.clone(),
            config.public_base_url.clone(),
        )),
        ImageProvider::Cloudinary => Arc::new(CloudinaryStorage::new(
            &config.cloudinary_api_base,
            required(&config.cloudinary_cloud_name, "cloudinary_cloud_name")?,
            required(&config.cloudinary_upload_preset, "cloudinary_upload_preset")?,
            &config.folder,
        )?),
    };
    info!("Image uploads go to {} storage", storage.provider_name());
    Ok(storage)
}
