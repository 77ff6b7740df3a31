// security/src/lib.rs

pub mod middleware;
pub mod roles;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use lib::storage_engine::CareStore;
use models::errors::{parse_optional_id, CareError};
use models::medical::{NewUser, Principal, Role, User};

pub use middleware::{require_auth, AuthGate, Authenticated};
pub use roles::AllowedRoles;

/// Lifetime of issued tokens when not configured otherwise.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 8;

/// User registration data transfer object (DTO).
/// Every field is optional so that absent fields produce a 400, not a parse failure.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub doctor_id: Option<String>,
}

/// User login data transfer object (DTO).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserLogin {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Claims for JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggedInUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    pub user: LoggedInUser,
}

/// Custom authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing auth header")]
    MissingHeader,

    #[error("Invalid auth header")]
    InvalidHeader,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Forbidden: insufficient role")]
    Forbidden,

    #[error("Missing credentials")]
    MissingCredentials,

    /// Same message for unknown email and wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    Token(String),

    #[error(transparent)]
    Care(#[from] CareError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader | AuthError::InvalidHeader | AuthError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::MissingCredentials | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Care(err) => care_status(err),
        }
    }
}

/// HTTP status for a domain error. Lifecycle and uniqueness violations are
/// client errors like any other bad input.
pub fn care_status(err: &CareError) -> StatusCode {
    match err {
        CareError::InvalidInput(_) | CareError::Precondition(_) | CareError::Conflict(_) => {
            StatusCode::BAD_REQUEST
        }
        CareError::Forbidden(_) => StatusCode::FORBIDDEN,
        CareError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            error!("Authentication failure: {}", self);
            "Server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Signs and verifies bearer tokens with one shared secret.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        TokenAuthority {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Token(format!("Failed to encode JWT: {}", e)))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registers a new user and returns its id.
///
/// Patients must name an existing doctor, who becomes their permanent
/// assigned doctor. A doctor id sent with a doctor registration is ignored.
pub async fn register_user(
    store: &dyn CareStore,
    registration: UserRegistration,
) -> Result<Uuid, AuthError> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        present(registration.name),
        present(registration.email),
        // Passwords are taken verbatim; only emptiness is checked.
        registration.password.filter(|p| !p.is_empty()),
        present(registration.role),
    ) else {
        return Err(CareError::invalid("Missing required fields").into());
    };
    let role: Role = role.parse()?;
    let email = normalize_email(&email);

    if store.get_user_by_email(&email).await?.is_some() {
        return Err(CareError::Conflict("Email already in use".to_string()).into());
    }

    let doctor_id = match role {
        Role::Doctor => None,
        Role::Patient => {
            let doctor_id = parse_optional_id("doctorId", registration.doctor_id.as_deref())?
                .ok_or_else(|| CareError::invalid("Patient must have doctorId"))?;
            let doctor = store.get_user(doctor_id).await?.filter(User::is_doctor);
            if doctor.is_none() {
                return Err(CareError::invalid("Assigned doctor not found").into());
            }
            Some(doctor_id)
        }
    };

    let new_user = NewUser {
        name,
        email,
        phone: present(registration.phone),
        password,
        role,
        doctor_id,
    };
    let user = tokio::task::spawn_blocking(move || User::from_new_user(new_user))
        .await
        .map_err(|e| CareError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(CareError::from)?;

    store.insert_user(&user).await?;
    info!("Registered {} {}", user.role, user.id);
    Ok(user.id)
}

/// Checks credentials and issues a token.
pub async fn login_user(
    store: &dyn CareStore,
    authority: &TokenAuthority,
    login: UserLogin,
) -> Result<LoginOutcome, AuthError> {
    let (Some(email), Some(password)) = (present(login.email), login.password.filter(|p| !p.is_empty()))
    else {
        return Err(AuthError::MissingCredentials);
    };

    let user = store
        .get_user_by_email(&normalize_email(&email))
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || User::verify_password(&password, &hash))
        .await
        .map_err(|e| CareError::Internal(format!("Password verification task failed: {}", e)))?
        .map_err(CareError::from)?;
    if !matches {
        return Err(AuthError::InvalidCredentials);
    }

    let token = authority.issue(&user)?;
    info!("{} {} logged in", user.role, user.id);
    Ok(LoginOutcome {
        token,
        user: LoggedInUser {
            id: user.id,
            name: user.name,
            role: user.role,
        },
    })
}
