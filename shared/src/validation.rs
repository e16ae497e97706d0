//! Validation utilities for the AgroFocus platform
//!
//! Domain validations shared by request handlers and services.

use chrono::NaiveDate;

use crate::geometry::Geometry;

// ============================================================================
// Spatial validations
// ============================================================================

/// Validate GPS coordinates
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), &'static str> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate a field boundary polygon
pub fn validate_boundary(geometry: &Geometry) -> Result<(), &'static str> {
    geometry
        .validate()
        .map_err(|_| "Boundary must be a closed polygon with at least 4 points")
}

/// Validate cloud coverage percentage
pub fn validate_cloud_coverage(percent: u8) -> Result<(), &'static str> {
    if percent > 100 {
        return Err("Cloud coverage must be between 0 and 100");
    }
    Ok(())
}

// ============================================================================
// Temporal validations
// ============================================================================

/// Validate that a date range is ordered
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if start > end {
        return Err("Start date must not be after end date");
    }
    Ok(())
}

/// Validate a season label like "2024/2025" (consecutive years)
pub fn validate_season_label(label: &str) -> Result<(i32, i32), &'static str> {
    let (first, second) = label
        .split_once('/')
        .ok_or("Season must have the form YYYY/YYYY")?;
    let start: i32 = first
        .parse()
        .map_err(|_| "Season must have the form YYYY/YYYY")?;
    let end: i32 = second
        .parse()
        .map_err(|_| "Season must have the form YYYY/YYYY")?;
    if end != start + 1 {
        return Err("Season years must be consecutive");
    }
    if !(1900..=2100).contains(&start) {
        return Err("Season year out of range");
    }
    Ok((start, end))
}

// ============================================================================
// General validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_bounds() {
        assert!(validate_coordinates(-23.55, -46.63).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn season_label_parsing() {
        assert_eq!(validate_season_label("2024/2025"), Ok((2024, 2025)));
        assert!(validate_season_label("2024/2026").is_err());
        assert!(validate_season_label("2024-2025").is_err());
        assert!(validate_season_label("abcd/efgh").is_err());
    }

    #[test]
    fn date_range_ordering() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(validate_date_range(a, b).is_ok());
        assert!(validate_date_range(b, a).is_err());
    }

    #[test]
    fn email_and_password() {
        assert!(validate_email("user@farm.br").is_ok());
        assert!(validate_email("bad").is_err());
        assert!(validate_password("long-enough").is_ok());
        assert!(validate_password("short").is_err());
    }
}
