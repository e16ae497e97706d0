//! Inspection and occurrence severity levels

use serde::{Deserialize, Serialize};

/// Severity of a field inspection finding or occurrence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Severity> {
        match value {
            "low" | "baixa" => Some(Severity::Low),
            "medium" | "media" => Some(Severity::Medium),
            "high" | "alta" => Some(Severity::High),
            _ => None,
        }
    }
}
