//! Business logic services for the AgroFocus backend

pub mod auth;
pub mod delineation;
pub mod field;
pub mod gdd;
pub mod indices;
pub mod monitoring;
pub mod productivity;

pub use auth::AuthService;
pub use delineation::DelineationService;
pub use field::FieldService;
pub use gdd::GddService;
pub use indices::IndicesService;
pub use monitoring::MonitoringService;
pub use productivity::ProductivityService;
