//! Field status and productivity zones

use serde::{Deserialize, Serialize};

/// Lifecycle status of a field boundary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Active,
    DetectedAuto,
    Adjusted,
    Retired,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Active => "active",
            FieldStatus::DetectedAuto => "detected_auto",
            FieldStatus::Adjusted => "adjusted",
            FieldStatus::Retired => "retired",
        }
    }
}

/// Productivity zone classified from historical NDVI
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProductivityZone {
    Low,
    Medium,
    High,
}

impl ProductivityZone {
    /// Classify a mean NDVI value: low < 0.4 <= medium <= 0.7 < high
    pub fn from_ndvi(ndvi: f64) -> ProductivityZone {
        if ndvi < 0.4 {
            ProductivityZone::Low
        } else if ndvi <= 0.7 {
            ProductivityZone::Medium
        } else {
            ProductivityZone::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductivityZone::Low => "low",
            ProductivityZone::Medium => "medium",
            ProductivityZone::High => "high",
        }
    }

    /// Map display color
    pub fn color(&self) -> &'static str {
        match self {
            ProductivityZone::Low => "#FF6B6B",
            ProductivityZone::Medium => "#FFD93D",
            ProductivityZone::High => "#6BCB77",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProductivityZone::Low => "Low productivity",
            ProductivityZone::Medium => "Medium productivity",
            ProductivityZone::High => "High productivity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_thresholds() {
        assert_eq!(ProductivityZone::from_ndvi(0.39), ProductivityZone::Low);
        assert_eq!(ProductivityZone::from_ndvi(0.4), ProductivityZone::Medium);
        assert_eq!(ProductivityZone::from_ndvi(0.7), ProductivityZone::Medium);
        assert_eq!(ProductivityZone::from_ndvi(0.71), ProductivityZone::High);
    }
}
