//! External API integrations

pub mod gee;
pub mod weather;

pub use gee::GeeClient;
pub use weather::WeatherClient;
