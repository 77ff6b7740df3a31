// models/src/medical/user.rs

use std::fmt;
use std::str::FromStr;

use bcrypt::{hash, verify, BcryptError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CareError, CareResult};

/// Work factor for stored password hashes.
pub const PASSWORD_HASH_COST: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CareError;

    fn from_str(s: &str) -> CareResult<Self> {
        match s {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            _ => Err(CareError::invalid("Invalid role")),
        }
    }
}

// --- DTO for New User Registration ---
// Holds the plaintext password only until it is hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: Role,
    pub doctor_id: Option<Uuid>,
}

// --- Stored User Struct ---
// Contains the password hash, never the plaintext password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    /// Assigned doctor, set once at registration for patients.
    pub doctor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Hashes a plaintext password with a random salt.
    pub fn hash_password(password: &str) -> Result<String, BcryptError> {
        hash(password, PASSWORD_HASH_COST)
    }

    /// Verifies a plaintext password against a stored hash.
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, BcryptError> {
        verify(password, hash)
    }

    /// Creates a new `User` from a `NewUser` DTO, hashing the password.
    pub fn from_new_user(new_user: NewUser) -> Result<Self, BcryptError> {
        let password_hash = Self::hash_password(&new_user.password)?;

        Ok(User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            phone: new_user.phone,
            password_hash,
            role: new_user.role,
            doctor_id: new_user.doctor_id,
            created_at: Utc::now(),
        })
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }

    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    /// The public projection returned to API clients.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// The authenticated caller, as decoded from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == Role::Patient
    }
}
