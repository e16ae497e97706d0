//! Geometry and delineation scoring tests
//!
//! Covers intersection-over-union behavior, pixel-to-hectare conversion
//! and the overlap consolidation rule used after segmentation.

use geo::{Area, BooleanOps, LineString, Polygon};
use proptest::prelude::*;

fn rectangle(x0: f64, y0: f64, width: f64, height: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (x0, y0),
            (x0 + width, y0),
            (x0 + width, y0 + height),
            (x0, y0 + height),
            (x0, y0),
        ]),
        vec![],
    )
}

fn iou(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    let intersection = a.intersection(b).unsigned_area();
    let union = a.union(b).unsigned_area();
    if union <= f64::EPSILON {
        0.0
    } else {
        intersection / union
    }
}

fn pixels_to_hectares(pixels: f64, resolution_meters: f64) -> f64 {
    pixels * resolution_meters * resolution_meters / 10_000.0
}

/// Overlap consolidation: a candidate is dropped when more than 30 % of
/// its area intersects an accepted region
fn is_dropped(candidate: &Polygon<f64>, accepted: &Polygon<f64>) -> bool {
    let candidate_area = candidate.unsigned_area();
    if candidate_area <= f64::EPSILON {
        return true;
    }
    accepted.intersection(candidate).unsigned_area() / candidate_area > 0.3
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_iou_identical() {
        let a = rectangle(0.0, 0.0, 10.0, 10.0);
        assert!((iou(&a, &a.clone()) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = rectangle(0.0, 0.0, 1.0, 1.0);
        let b = rectangle(10.0, 10.0, 1.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        // unit squares sharing half their area: 0.5 / 1.5
        let a = rectangle(0.0, 0.0, 1.0, 1.0);
        let b = rectangle(0.5, 0.0, 1.0, 1.0);
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou_meets_target_for_close_boundaries() {
        // a manual boundary and a detection off by 5 % per side
        let manual = rectangle(0.0, 0.0, 100.0, 100.0);
        let detected = rectangle(2.5, 2.5, 95.0, 95.0);
        let value = iou(&manual, &detected);
        assert!(value >= 0.75, "IoU target missed: {}", value);
    }

    #[test]
    fn test_pixel_area_conversion() {
        // 1 ha = 10_000 m² = 100 px at 10 m resolution
        assert_eq!(pixels_to_hectares(100.0, 10.0), 1.0);
        assert_eq!(pixels_to_hectares(10_000.0, 10.0), 100.0);
        // finer resolution shrinks the footprint per pixel
        assert_eq!(pixels_to_hectares(100.0, 5.0), 0.25);
    }

    #[test]
    fn test_consolidation_drops_contained_candidate() {
        let accepted = rectangle(0.0, 0.0, 20.0, 20.0);
        let contained = rectangle(5.0, 5.0, 5.0, 5.0);
        assert!(is_dropped(&contained, &accepted));
    }

    #[test]
    fn test_consolidation_keeps_light_overlap() {
        let accepted = rectangle(0.0, 0.0, 10.0, 10.0);
        // 20 % of the candidate overlaps the accepted region
        let neighbor = rectangle(8.0, 0.0, 10.0, 10.0);
        assert!(!is_dropped(&neighbor, &accepted));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn rect_strategy() -> impl Strategy<Value = Polygon<f64>> {
        (0.0f64..50.0, 0.0f64..50.0, 1.0f64..30.0, 1.0f64..30.0)
            .prop_map(|(x, y, w, h)| rectangle(x, y, w, h))
    }

    proptest! {
        #[test]
        fn iou_is_bounded(a in rect_strategy(), b in rect_strategy()) {
            let value = iou(&a, &b);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&value));
        }

        #[test]
        fn iou_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
            prop_assert!((iou(&a, &b) - iou(&b, &a)).abs() < 1e-9);
        }

        #[test]
        fn iou_of_self_is_one(a in rect_strategy()) {
            prop_assert!((iou(&a, &a.clone()) - 1.0).abs() < 1e-6);
        }

        #[test]
        fn hectare_conversion_scales_linearly(
            pixels in 1.0f64..1_000_000.0,
            factor in 1.0f64..10.0,
        ) {
            let base = pixels_to_hectares(pixels, 10.0);
            let scaled = pixels_to_hectares(pixels * factor, 10.0);
            prop_assert!((scaled - base * factor).abs() < 1e-6 * scaled.max(1.0));
        }
    }
}
