//! HTTP request handlers for the AgroFocus backend

mod auth;
mod delineation;
mod health;
mod indices;
mod meteorology;
mod monitoring;
mod productivity;

pub use auth::*;
pub use delineation::*;
pub use health::*;
pub use indices::*;
pub use meteorology::*;
pub use monitoring::*;
pub use productivity::*;
