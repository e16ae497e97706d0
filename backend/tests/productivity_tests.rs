//! Productivity estimation tests
//!
//! Covers the NDVI calibration bands, the deviation alert thresholds and
//! the season trend classification.

use proptest::prelude::*;

/// Corn calibration bands: (ndvi_min, ndvi_max, yield_low, yield_high)
const CORN_BANDS: [(f64, f64, f64, f64); 4] = [
    (0.8, 1.0, 12.0, 14.0),
    (0.6, 0.8, 8.0, 12.0),
    (0.4, 0.6, 5.0, 8.0),
    (0.0, 0.4, 0.0, 5.0),
];

fn band_for(ndvi: f64) -> Option<(f64, f64, f64, f64)> {
    CORN_BANDS
        .iter()
        .copied()
        .find(|(min, max, _, _)| ndvi >= *min && ndvi <= *max)
}

fn band_estimate(ndvi: f64) -> Option<f64> {
    band_for(ndvi).map(|(_, _, low, high)| (low + high) / 2.0)
}

/// Alert level for a deviation from the historical mean
fn alert_level(estimate: f64, mean: f64) -> Option<&'static str> {
    let percent = (estimate - mean) / mean * 100.0;
    if percent < -20.0 {
        Some("critical")
    } else if percent < -10.0 {
        Some("warning")
    } else if percent > 10.0 {
        Some("positive")
    } else {
        None
    }
}

/// Trend from newest-to-oldest yields: ±5 % decides the direction
fn trend_direction(yields: &[f64]) -> Option<&'static str> {
    if yields.len() < 2 {
        return None;
    }
    let newest = yields[0];
    let oldest = *yields.last().unwrap();
    let variation = (newest - oldest) / oldest * 100.0;
    Some(if variation > 5.0 {
        "rising"
    } else if variation < -5.0 {
        "falling"
    } else {
        "stable"
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_band_labels_by_range() {
        assert_eq!(band_estimate(0.9), Some(13.0));
        assert_eq!(band_estimate(0.7), Some(10.0));
        assert_eq!(band_estimate(0.5), Some(6.5));
        assert_eq!(band_estimate(0.2), Some(2.5));
    }

    #[test]
    fn test_band_coverage_is_complete() {
        for i in 0..=100 {
            let ndvi = i as f64 / 100.0;
            assert!(band_for(ndvi).is_some(), "no band for NDVI {}", ndvi);
        }
    }

    #[test]
    fn test_alert_thresholds() {
        assert_eq!(alert_level(7.5, 10.0), Some("critical"));
        assert_eq!(alert_level(8.5, 10.0), Some("warning"));
        assert_eq!(alert_level(11.5, 10.0), Some("positive"));
        assert_eq!(alert_level(9.5, 10.0), None);
        assert_eq!(alert_level(10.5, 10.0), None);
    }

    #[test]
    fn test_trend_directions() {
        assert_eq!(trend_direction(&[10.8, 10.4, 10.0]), Some("rising"));
        assert_eq!(trend_direction(&[9.0, 9.8, 10.0]), Some("falling"));
        assert_eq!(trend_direction(&[10.2, 9.9, 10.0]), Some("stable"));
        assert_eq!(trend_direction(&[10.0]), None);
    }

    #[test]
    fn test_linear_prediction_shape() {
        // a fitted model is an affine map of the three features
        let intercept = 2.0;
        let coefficients = [10.0, 0.001, 0.002];
        let predict = |ndvi: f64, gdd: f64, precip: f64| {
            intercept + coefficients[0] * ndvi + coefficients[1] * gdd + coefficients[2] * precip
        };
        let base = predict(0.7, 1500.0, 450.0);
        // raising NDVI by 0.1 raises the prediction by its coefficient share
        let raised = predict(0.8, 1500.0, 450.0);
        assert!((raised - base - 1.0).abs() < 1e-9);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn estimate_lies_inside_its_band(ndvi in 0.0f64..=1.0) {
            let (_, _, low, high) = band_for(ndvi).unwrap();
            let estimate = band_estimate(ndvi).unwrap();
            prop_assert!(estimate >= low && estimate <= high);
        }

        #[test]
        fn estimate_is_monotone_across_bands(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(band_estimate(low).unwrap() <= band_estimate(high).unwrap());
        }

        #[test]
        fn alerts_only_fire_outside_the_quiet_zone(
            estimate in 0.1f64..20.0,
            mean in 1.0f64..20.0,
        ) {
            let percent = (estimate - mean) / mean * 100.0;
            match alert_level(estimate, mean) {
                None => prop_assert!((-10.0..=10.0).contains(&percent)),
                Some("critical") => prop_assert!(percent < -20.0),
                Some("warning") => prop_assert!((-20.0..-10.0).contains(&percent)),
                Some("positive") => prop_assert!(percent > 10.0),
                Some(other) => prop_assert!(false, "unexpected level {}", other),
            }
        }
    }
}
