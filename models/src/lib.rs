// models/src/lib.rs

pub mod errors;
pub mod medical;

pub use errors::{CareError, CareResult};
pub use medical::*;
