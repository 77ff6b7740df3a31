// lib/src/lib.rs
//
// Storage engines and the services that implement the home-dialysis care
// workflow on top of them. HTTP concerns live in `rest_api`; token handling
// lives in `security`.

pub mod access;
pub mod analytics;
pub mod clinical;
pub mod directory;
pub mod events;
pub mod evidence;
pub mod ledger;
pub mod object_storage;
pub mod storage_engine;

pub use storage_engine::{open_care_store, CareStore, StorageConfig, StorageEngineType};

#[cfg(test)]
pub(crate) mod test_support;
