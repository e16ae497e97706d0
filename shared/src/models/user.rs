//! User profile types

use serde::{Deserialize, Serialize};

/// High-level profile of a platform user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserProfile {
    #[default]
    Producer,
    Agronomist,
    Specialist,
    Admin,
}

impl UserProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserProfile::Producer => "producer",
            UserProfile::Agronomist => "agronomist",
            UserProfile::Specialist => "specialist",
            UserProfile::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<UserProfile> {
        match value {
            "producer" => Some(UserProfile::Producer),
            "agronomist" => Some(UserProfile::Agronomist),
            "specialist" => Some(UserProfile::Specialist),
            "admin" => Some(UserProfile::Admin),
            _ => None,
        }
    }
}
