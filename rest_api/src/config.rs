// rest_api/src/config.rs

use std::path::PathBuf;

use axum::http::HeaderValue;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use lib::object_storage::{ImageProvider, ImageStorageConfig, DEFAULT_CLOUDINARY_API_BASE, DEFAULT_IMAGE_FOLDER};
use lib::storage_engine::{StorageConfig, StorageEngineType};
use security::DEFAULT_TOKEN_TTL_HOURS;

/// Name of the optional configuration file, without extension.
pub const DEFAULT_CONFIG_FILE: &str = "homecare";
/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "HOMECARE_CONFIG";
pub const ENV_PREFIX: &str = "HOMECARE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            jwt_secret: String::new(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub engine: String,
    pub data_directory: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        let defaults = StorageConfig::default();
        StorageSection {
            engine: defaults.engine.to_string(),
            data_directory: defaults.data_directory,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    pub provider: String,
    /// Served at `/uploads` when the provider is `local`.
    pub local_directory: PathBuf,
    pub public_base_url: String,
    pub cloudinary_api_base: String,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
    pub folder: String,
}

impl Default for ImagesSection {
    fn default() -> Self {
        let defaults = ImageStorageConfig::default();
        ImagesSection {
            provider: defaults.provider.to_string(),
            local_directory: defaults.local_directory,
            public_base_url: defaults.public_base_url,
            cloudinary_api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
            folder: DEFAULT_IMAGE_FOLDER.to_string(),
        }
    }
}

/// Complete service configuration, built once at startup and handed to the
/// components that need it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageSection,
    pub images: ImagesSection,
}

impl AppConfig {
    /// Defaults, then `homecare.{yaml,toml,json}` (or `$HOMECARE_CONFIG`), then
    /// `HOMECARE__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            )
            .build()?;
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must be set".to_string()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }
        for origin in &self.server.allowed_origins {
            HeaderValue::from_str(origin)
                .map_err(|_| ConfigError::Invalid(format!("Invalid CORS origin: {}", origin)))?;
        }
        self.storage_config()?;
        let images = self.image_config()?;
        if images.provider == ImageProvider::Cloudinary
            && (blank(&images.cloudinary_cloud_name) || blank(&images.cloudinary_upload_preset))
        {
            return Err(ConfigError::Invalid(
                "images.cloudinary_cloud_name and images.cloudinary_upload_preset are required for cloudinary"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn storage_config(&self) -> Result<StorageConfig, ConfigError> {
        let engine: StorageEngineType = self
            .storage
            .engine
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("storage.engine: {}", e)))?;
        Ok(StorageConfig {
            engine,
            data_directory: self.storage.data_directory.clone(),
        })
    }

    pub fn image_config(&self) -> Result<ImageStorageConfig, ConfigError> {
        let provider: ImageProvider = self
            .images
            .provider
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("images.provider: {}", e)))?;
        Ok(ImageStorageConfig {
            provider,
            local_directory: self.images.local_directory.clone(),
            public_base_url: self.images.public_base_url.clone(),
            cloudinary_api_base: self.images.cloudinary_api_base.clone(),
            cloudinary_cloud_name: self.images.cloudinary_cloud_name.clone(),
            cloudinary_upload_preset: self.images.cloudinary_upload_preset.clone(),
            folder: self.images.folder.clone(),
        })
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_secret() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "s3cret".into();
        config
    }

    #[test]
    fn defaults_need_only_a_secret() {
        assert!(AppConfig::default().validate().is_err());
        let config = with_secret();
        config.validate().unwrap();
        assert_eq!(config.auth.token_ttl_hours, 8);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.storage_config().unwrap().engine, StorageEngineType::Sled);
    }

    #[test]
    fn cloudinary_requires_credentials() {
        let mut config = with_secret();
        config.images.provider = "cloudinary".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cloudinary_cloud_name"));

        config.images.cloudinary_cloud_name = Some("demo".into());
        config.images.cloudinary_upload_preset = Some("unsigned".into());
        config.validate().unwrap();
    }

    #[test]
    fn unknown_engine_and_port_zero_are_rejected() {
        let mut config = with_secret();
        config.storage.engine = "rocksdb".into();
        assert!(config.validate().is_err());

        let mut config = with_secret();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 6100\nauth:\n  jwt_secret: from-file\nstorage:\n  engine: memory\n"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 6100);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.storage_config().unwrap().engine, StorageEngineType::Memory);
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
