// models/src/errors.rs

pub use thiserror::Error;
use bcrypt::BcryptError;
use serde_json::Error as SerdeJsonError;
use uuid::Error as UuidError;

/// Every failure a care-tracking operation can end in.
///
/// The variants follow the categories surfaced over HTTP: bad input and
/// lifecycle violations are client errors, ownership failures are forbidden,
/// missing or foreign records are not found, everything else is internal.
#[derive(Debug, Error)]
pub enum CareError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The record exists but is not in a state that allows the action.
    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sled-errors")]
    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CareError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CareError::InvalidInput(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CareError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CareError::NotFound(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        CareError::Precondition(msg.into())
    }

    /// True for errors caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CareError::InvalidInput(_)
                | CareError::Forbidden(_)
                | CareError::NotFound(_)
                | CareError::Precondition(_)
                | CareError::Conflict(_)
        )
    }
}

impl From<UuidError> for CareError {
    fn from(err: UuidError) -> Self {
        CareError::InvalidInput(format!("Invalid identifier: {}", err))
    }
}

/// A type alias for a `Result` that returns a `CareError` on failure.
pub type CareResult<T> = Result<T, CareError>;

/// Parses a required identifier field from a request body.
///
/// Produces `"<field> is required"` when absent or blank and
/// `"Invalid <field>"` when it is not a UUID.
pub fn parse_required_id(field: &str, value: Option<&str>) -> CareResult<uuid::Uuid> {
    match value.map(str::trim) {
        None | Some("") => Err(CareError::invalid(format!("{} is required", field))),
        Some(raw) => uuid::Uuid::parse_str(raw)
            .map_err(|_| CareError::invalid(format!("Invalid {}", field))),
    }
}

/// Like [`parse_required_id`] but an absent field is `Ok(None)`.
pub fn parse_optional_id(field: &str, value: Option<&str>) -> CareResult<Option<uuid::Uuid>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => uuid::Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| CareError::invalid(format!("Invalid {}", field))),
    }
}
