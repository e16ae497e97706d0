//! Shared types and models for the AgroFocus platform
//!
//! This crate contains domain types shared between the backend services,
//! the segmentation pipeline, and API payloads.

pub mod geometry;
pub mod models;
pub mod types;
pub mod validation;

pub use geometry::*;
pub use models::*;
pub use types::*;
pub use validation::*;
