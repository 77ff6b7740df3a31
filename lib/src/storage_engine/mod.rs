// lib/src/storage_engine/mod.rs

pub mod config;
pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;

use std::sync::Arc;

use log::info;
use models::errors::CareResult;

pub use config::{StorageConfig, StorageEngineType};
pub use inmemory_storage::InMemoryCareStore;
pub use sled_storage::SledCareStore;
pub use storage_engine::{CareStore, ClinicalStore, EventStore, ImageStore, SessionStore, UserStore};

/// Opens the store selected by `config`.
pub fn open_care_store(config: &StorageConfig) -> CareResult<Arc<dyn CareStore>> {
    let store: Arc<dyn CareStore> = match config.engine {
        StorageEngineType::Sled => Arc::new(SledCareStore::open(&config.data_directory)?),
        StorageEngineType::Memory => Arc::new(InMemoryCareStore::new()),
    };
    info!(
        "Opened {} care store (data directory: {})",
        store.engine_name(),
        config.data_directory.display()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use models::errors::CareError;
    use models::medical::{
        Event, EventOrigin, EventType, Image, MaterialKit, MedicalProfile, NewEvent, ProfileDetails,
        Role, Session, Severity,
    };

    use super::{ClinicalStore, EventStore, ImageStore, SessionStore, UserStore};
    use crate::test_support::{doctor, patient_of, Clinic};

    // Both engines must behave identically; every check runs against each.
    async fn clinics() -> Vec<Clinic> {
        vec![Clinic::in_memory().await, Clinic::on_sled().await]
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        for clinic in clinics().await {
            let dup = doctor("doctor@example.com");
            let err = clinic.store.insert_user(&dup).await.unwrap_err();
            assert!(matches!(err, CareError::Conflict(_)), "{}", clinic.store.engine_name());
            let found = clinic.store.get_user_by_email("doctor@example.com").await.unwrap().unwrap();
            assert_eq!(found.id, clinic.doctor.id);
        }
    }

    #[tokio::test]
    async fn patients_are_listed_per_doctor() {
        for clinic in clinics().await {
            let second = patient_of(&clinic.doctor, "second@example.com");
            clinic.store.insert_user(&second).await.unwrap();
            let patients = clinic.store.patients_of(clinic.doctor.id).await.unwrap();
            let ids: Vec<_> = patients.iter().map(|p| p.id).collect();
            assert_eq!(ids.len(), 2);
            assert!(ids.contains(&clinic.patient.id) && ids.contains(&second.id));
            assert!(!ids.contains(&clinic.other_patient.id));
        }
    }

    #[tokio::test]
    async fn sessions_round_trip_and_group_by_material() {
        for clinic in clinics().await {
            let material = Session::new_material(
                clinic.doctor.id,
                clinic.patient.id,
                MaterialKit { sessions_count: 2, ..Default::default() },
                String::new(),
            );
            clinic.store.insert_session(&material).await.unwrap();
            let dialysis = Session::new_dialysis(clinic.doctor.id, clinic.patient.id, material.id);
            clinic.store.insert_session(&dialysis).await.unwrap();

            let stored = clinic.store.get_session(material.id).await.unwrap().unwrap();
            assert_eq!(stored, material);

            let children = clinic.store.dialysis_sessions_for_material(material.id).await.unwrap();
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].id, dialysis.id);

            let all = clinic.store.sessions_for_patient(clinic.patient.id).await.unwrap();
            assert_eq!(all.len(), 2);
            assert!(clinic.store.sessions_for_patient(clinic.other_patient.id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn updating_a_missing_session_is_not_found() {
        for clinic in clinics().await {
            let ghost = Session::new_dialysis(clinic.doctor.id, clinic.patient.id, uuid::Uuid::new_v4());
            let err = clinic.store.update_session(&ghost).await.unwrap_err();
            assert!(matches!(err, CareError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn images_are_filtered_by_session() {
        for clinic in clinics().await {
            let (a, b) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
            for (session, url) in [(a, "https://x/1"), (b, "https://x/2"), (a, "https://x/3")] {
                let img = Image::new(session, Role::Patient, clinic.patient.id, url.into(), url.into(), None);
                clinic.store.insert_image(&img).await.unwrap();
            }
            assert_eq!(clinic.store.images_for_sessions(&[a]).await.unwrap().len(), 2);
            assert_eq!(clinic.store.images_for_sessions(&[a, b]).await.unwrap().len(), 3);
            assert!(clinic.store.images_for_sessions(&[]).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn cr_number_is_unique_across_patients() {
        for clinic in clinics().await {
            let details = ProfileDetails { cr_number: Some("CR-1".into()), ..Default::default() };
            let first = MedicalProfile::upserted(None, clinic.patient.id, clinic.doctor.id, details.clone());
            clinic.store.put_profile(&first).await.unwrap();
            // Same patient may re-save with the same number.
            clinic.store.put_profile(&first).await.unwrap();

            let clash = MedicalProfile::upserted(None, clinic.other_patient.id, clinic.other_doctor.id, details);
            let err = clinic.store.put_profile(&clash).await.unwrap_err();
            assert!(matches!(err, CareError::Conflict(_)));

            // Releasing the number lets someone else take it.
            let renumbered = MedicalProfile::upserted(
                Some(&first),
                clinic.patient.id,
                clinic.doctor.id,
                ProfileDetails { cr_number: Some("CR-2".into()), ..Default::default() },
            );
            clinic.store.put_profile(&renumbered).await.unwrap();
            clinic.store.put_profile(&clash).await.unwrap();
        }
    }

    #[tokio::test]
    async fn followups_are_newest_first() {
        for clinic in clinics().await {
            for day in [3, 1, 2] {
                let date = NaiveDate::from_ymd_opt(2025, 5, day).unwrap();
                let f = models::medical::FollowUpAssessment::upserted(
                    None,
                    clinic.patient.id,
                    clinic.doctor.id,
                    date,
                    Default::default(),
                );
                clinic.store.put_followup(&f).await.unwrap();
            }
            let days: Vec<u32> = clinic
                .store
                .followups_for_patient(clinic.patient.id)
                .await
                .unwrap()
                .iter()
                .map(|f| chrono::Datelike::day(&f.visit_date))
                .collect();
            assert_eq!(days, vec![3, 2, 1]);
        }
    }

    #[tokio::test]
    async fn events_are_newest_first_and_updatable() {
        for clinic in clinics().await {
            let now = Utc::now();
            let mut ids = Vec::new();
            for offset in [2, 0, 1] {
                let event = Event::new(
                    clinic.patient.id,
                    clinic.doctor.id,
                    EventOrigin::Patient,
                    NewEvent {
                        event_type: EventType::MissedDialysis,
                        description: String::new(),
                        severity: Severity::Mild,
                        related_session_id: None,
                        event_date: now - Duration::days(offset),
                    },
                );
                clinic.store.insert_event(&event).await.unwrap();
                ids.push(event);
            }
            let listed = clinic.store.events_for_patient(clinic.patient.id).await.unwrap();
            assert_eq!(listed[0].id, ids[1].id);
            assert_eq!(listed[2].id, ids[0].id);

            let mut closed = ids[0].clone();
            closed.resolve(clinic.doctor.id, Some("ok".into()), now);
            clinic.store.update_event(&closed).await.unwrap();
            assert!(clinic.store.get_event(closed.id).await.unwrap().unwrap().resolved);
        }
    }
}
