//! Productivity-zone classification from multi-year NDVI history
//!
//! Pixels are averaged across years, thresholded into low/medium/high
//! zones, cleaned of speckle, and returned as polygons with their zonal
//! NDVI mean.

use geo::{Area, Simplify};
use ndarray::Array2;
use shared::ProductivityZone;

use super::contour::{outline_to_polygon, trace_outline};
use super::label::{label_regions, region_sizes, remove_small_holes, remove_small_objects};
use super::raster::Grid;
use super::SegmentationError;

/// Speckle cleanup thresholds (pixels)
const MIN_OBJECT_PIXELS: usize = 100;
const MAX_HOLE_PIXELS: usize = 100;

/// A classified productivity-zone region (pixel-space polygon)
#[derive(Debug, Clone)]
pub struct ZoneRegion {
    pub zone: ProductivityZone,
    pub polygon: geo::Polygon<f64>,
    pub area_pixels: usize,
    pub mean_ndvi: f64,
}

/// Per-pixel mean across years, ignoring NaN samples
pub fn mean_ndvi_grid(history: &[Grid]) -> Result<Grid, SegmentationError> {
    let first = history.first().ok_or(SegmentationError::EmptyImage)?;
    let shape = first.shape();
    if history.iter().any(|g| g.shape() != shape) {
        return Err(SegmentationError::ShapeMismatch);
    }

    let (rows, cols) = shape;
    let mut sums = Array2::<f64>::zeros((rows, cols));
    let mut counts = Array2::<u32>::zeros((rows, cols));
    for grid in history {
        for ((r, c), &v) in grid.data().indexed_iter() {
            if v.is_finite() {
                sums[[r, c]] += v;
                counts[[r, c]] += 1;
            }
        }
    }

    let mut mean = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    for r in 0..rows {
        for c in 0..cols {
            if counts[[r, c]] > 0 {
                mean[[r, c]] = sums[[r, c]] / counts[[r, c]] as f64;
            }
        }
    }
    Ok(Grid::from_array(mean))
}

/// Classify productivity zones from an NDVI history.
///
/// Regions smaller than `min_region_pixels` are dropped after speckle
/// cleanup, matching the original pipeline's 500-pixel floor.
pub fn classify_zones(
    history: &[Grid],
    min_region_pixels: usize,
) -> Result<Vec<ZoneRegion>, SegmentationError> {
    let mean = mean_ndvi_grid(history)?;
    let mut regions = Vec::new();

    for zone in [
        ProductivityZone::Low,
        ProductivityZone::Medium,
        ProductivityZone::High,
    ] {
        let mask = mean
            .data()
            .map(|&v| v.is_finite() && ProductivityZone::from_ndvi(v) == zone);
        let cleaned = remove_small_objects(&mask, MIN_OBJECT_PIXELS.min(min_region_pixels));
        let cleaned = remove_small_holes(&cleaned, MAX_HOLE_PIXELS);

        let (labels, count) = label_regions(&cleaned, true);
        let sizes = region_sizes(&labels, count);

        for label in 1..=count {
            if sizes[label] < min_region_pixels {
                continue;
            }
            let region_mask = labels.map(|&l| l == label as i32);
            let Some(outline) = trace_outline(&region_mask) else {
                continue;
            };
            let Some(polygon) = outline_to_polygon(&outline) else {
                continue;
            };
            let simplified = polygon.simplify(&2.0);
            if simplified.unsigned_area() <= 0.0 {
                continue;
            }

            let mut sum = 0.0;
            let mut n = 0usize;
            for ((r, c), &inside) in region_mask.indexed_iter() {
                if inside {
                    let v = mean.get(r, c);
                    if v.is_finite() {
                        sum += v;
                        n += 1;
                    }
                }
            }
            if n == 0 {
                continue;
            }

            regions.push(ZoneRegion {
                zone,
                polygon: simplified,
                area_pixels: sizes[label],
                mean_ndvi: sum / n as f64,
            });
        }
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_grid(rows: usize, cols: usize, value: f64) -> Grid {
        Grid::from_rows(vec![vec![value; cols]; rows]).unwrap()
    }

    #[test]
    fn mean_ignores_nan_samples() {
        let mut a = uniform_grid(4, 4, 0.6);
        a.set(0, 0, f64::NAN);
        let b = uniform_grid(4, 4, 0.8);
        let mean = mean_ndvi_grid(&[a, b]).unwrap();
        assert!((mean.get(1, 1) - 0.7).abs() < 1e-12);
        assert!((mean.get(0, 0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn mismatched_shapes_rejected() {
        let a = uniform_grid(4, 4, 0.5);
        let b = uniform_grid(4, 5, 0.5);
        assert!(matches!(
            mean_ndvi_grid(&[a, b]),
            Err(SegmentationError::ShapeMismatch)
        ));
    }

    #[test]
    fn splits_grid_into_zones() {
        // left half high NDVI, right half low, across two years
        let mut year = Grid::zeros(40, 40);
        for r in 0..40 {
            for c in 0..20 {
                year.set(r, c, 0.85);
            }
            for c in 20..40 {
                year.set(r, c, 0.2);
            }
        }
        let history = vec![year.clone(), year];
        let regions = classify_zones(&history, 200).unwrap();

        let high: Vec<_> = regions
            .iter()
            .filter(|z| z.zone == ProductivityZone::High)
            .collect();
        let low: Vec<_> = regions
            .iter()
            .filter(|z| z.zone == ProductivityZone::Low)
            .collect();
        assert_eq!(high.len(), 1);
        assert_eq!(low.len(), 1);
        assert!((high[0].mean_ndvi - 0.85).abs() < 1e-9);
        assert!((low[0].mean_ndvi - 0.2).abs() < 1e-9);
        assert!(regions
            .iter()
            .all(|z| z.zone != ProductivityZone::Medium));
    }

    #[test]
    fn small_regions_are_dropped() {
        let mut year = uniform_grid(40, 40, 0.5);
        // a 5x5 high patch, below the region floor
        for r in 0..5 {
            for c in 0..5 {
                year.set(r, c, 0.9);
            }
        }
        let regions = classify_zones(&[year], 200).unwrap();
        assert!(regions.iter().all(|z| z.zone == ProductivityZone::Medium));
    }
}
