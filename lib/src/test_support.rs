// lib/src/test_support.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use models::medical::{Principal, Role, User};

use crate::storage_engine::{CareStore, InMemoryCareStore, SledCareStore};

pub fn doctor(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: format!("Dr. {}", email),
        email: email.to_string(),
        phone: None,
        password_hash: "not-a-real-hash".to_string(),
        role: Role::Doctor,
        doctor_id: None,
        created_at: Utc::now(),
    }
}

pub fn patient_of(doctor: &User, email: &str) -> User {
    User {
        role: Role::Patient,
        doctor_id: Some(doctor.id),
        name: format!("Patient {}", email),
        ..self::doctor(email)
    }
}

pub fn principal(user: &User) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

/// Two doctors, each with one patient, already stored.
pub struct Clinic {
    pub store: Arc<dyn CareStore>,
    pub doctor: User,
    pub patient: User,
    pub other_doctor: User,
    pub other_patient: User,
}

impl Clinic {
    pub async fn in_memory() -> Self {
        Self::seed(Arc::new(InMemoryCareStore::new())).await
    }

    pub async fn on_sled() -> Self {
        Self::seed(Arc::new(SledCareStore::temporary().unwrap())).await
    }

    async fn seed(store: Arc<dyn CareStore>) -> Self {
        let doctor = doctor("doctor@example.com");
        let patient = patient_of(&doctor, "patient@example.com");
        let other_doctor = self::doctor("other-doctor@example.com");
        let other_patient = patient_of(&other_doctor, "other-patient@example.com");
        for user in [&doctor, &patient, &other_doctor, &other_patient] {
            store.insert_user(user).await.unwrap();
        }
        Clinic { store, doctor, patient, other_doctor, other_patient }
    }

    pub fn doctor_principal(&self) -> Principal {
        principal(&self.doctor)
    }

    pub fn patient_principal(&self) -> Principal {
        principal(&self.patient)
    }

    pub fn other_doctor_principal(&self) -> Principal {
        principal(&self.other_doctor)
    }

    pub fn other_patient_principal(&self) -> Principal {
        principal(&self.other_patient)
    }
}
