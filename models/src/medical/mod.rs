// models/src/medical/mod.rs

pub mod baseline_assessment;
pub mod event;
pub mod followup_assessment;
pub mod image;
mod lenient;
pub mod medical_profile;
pub mod session;
pub mod user;

pub use baseline_assessment::*;
pub use event::*;
pub use followup_assessment::*;
pub use image::*;
pub use medical_profile::*;
pub use session::*;
pub use user::*;
