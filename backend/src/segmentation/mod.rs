//! Field-boundary segmentation from satellite rasters
//!
//! Three strategies, selected per request: marker-based watershed (default),
//! edge detection with convex hulls, and stability-based mask proposals.
//! All of them produce pixel-space polygons that the delineation service
//! post-processes (simplification, area filters, overlap consolidation) and
//! maps to geographic coordinates.

pub mod contour;
pub mod distance;
pub mod edge;
pub mod filter;
pub mod label;
pub mod morphology;
pub mod raster;
pub mod stability;
pub mod watershed;
pub mod zones;

use geo::{Area, BooleanOps, Polygon, Simplify};
use ndarray::Array2;
use thiserror::Error;

use contour::{component_outline, convex_hull_polygon, outline_to_polygon, region_outline};
use distance::chamfer_distance;
use edge::canny;
use filter::gaussian_blur;
use label::{label_regions, region_sizes};
use raster::Grid;
use stability::{stable_masks, StabilityParams};

/// Errors from the segmentation pipeline
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("image is empty")]
    EmptyImage,
    #[error("image too small: {rows}x{cols}, at least 8x8 required")]
    ImageTooSmall { rows: usize, cols: usize },
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("TIFF decoding failed: {0}")]
    TiffDecode(String),
    #[error("NDVI history grids have mismatched shapes")]
    ShapeMismatch,
}

/// Available segmentation algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentationAlgorithm {
    #[default]
    Watershed,
    Edge,
    Sam,
}

impl SegmentationAlgorithm {
    pub const ALL: [SegmentationAlgorithm; 3] = [
        SegmentationAlgorithm::Watershed,
        SegmentationAlgorithm::Edge,
        SegmentationAlgorithm::Sam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationAlgorithm::Watershed => "watershed",
            SegmentationAlgorithm::Edge => "edge",
            SegmentationAlgorithm::Sam => "sam",
        }
    }

    /// Unknown names fall back to the default algorithm
    pub fn parse_or_default(value: &str) -> SegmentationAlgorithm {
        match value.to_ascii_lowercase().as_str() {
            "watershed" => SegmentationAlgorithm::Watershed,
            "edge" => SegmentationAlgorithm::Edge,
            "sam" => SegmentationAlgorithm::Sam,
            _ => SegmentationAlgorithm::default(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SegmentationAlgorithm::Watershed => {
                "Marker-based watershed over the gradient, seeded from edge-distance maxima"
            }
            SegmentationAlgorithm::Edge => {
                "Canny edges with morphological closing and convex-hull regions"
            }
            SegmentationAlgorithm::Sam => {
                "Stability-scored mask proposals over an intensity threshold ladder"
            }
        }
    }

    /// Benchmark IoU against manual delineation, used when no reference
    /// geometry is available to compute the real score
    pub fn benchmark_iou(&self) -> f64 {
        match self {
            SegmentationAlgorithm::Sam => 0.85,
            SegmentationAlgorithm::Watershed => 0.75,
            SegmentationAlgorithm::Edge => 0.70,
        }
    }

    fn default_simplify_tolerance(&self) -> f64 {
        match self {
            SegmentationAlgorithm::Watershed => 3.0,
            SegmentationAlgorithm::Edge => 2.0,
            SegmentationAlgorithm::Sam => 5.0,
        }
    }
}

/// Tunable segmentation parameters (pixel units)
#[derive(Debug, Clone)]
pub struct SegmentationParams {
    pub min_area_pixels: f64,
    pub max_area_pixels: f64,
    pub simplify_tolerance: Option<f64>,
    pub stability_threshold: f64,
    pub max_regions: Option<usize>,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            // ~1 ha to ~1000 ha at 10 m resolution
            min_area_pixels: 10_000.0,
            max_area_pixels: 10_000_000.0,
            simplify_tolerance: None,
            stability_threshold: 0.9,
            max_regions: None,
        }
    }
}

/// A segmented region: pixel-space polygon, polygon area and score
#[derive(Debug, Clone)]
pub struct RegionPolygon {
    pub polygon: Polygon<f64>,
    pub area_pixels: f64,
    pub score: f64,
}

/// Segment a grid into candidate field polygons
pub fn segment(
    grid: &Grid,
    algorithm: SegmentationAlgorithm,
    params: &SegmentationParams,
) -> Result<Vec<RegionPolygon>, SegmentationError> {
    let (rows, cols) = grid.shape();
    if rows < 8 || cols < 8 {
        return Err(SegmentationError::ImageTooSmall { rows, cols });
    }

    let normalized = grid.normalized();
    let tolerance = params
        .simplify_tolerance
        .unwrap_or_else(|| algorithm.default_simplify_tolerance());

    let regions = match algorithm {
        SegmentationAlgorithm::Watershed => watershed_pipeline(&normalized, params, tolerance),
        SegmentationAlgorithm::Edge => edge_pipeline(&normalized, params, tolerance),
        SegmentationAlgorithm::Sam => stability_pipeline(&normalized, params, tolerance),
    };

    let mut consolidated = consolidate(regions);
    if let Some(cap) = params.max_regions {
        consolidated.truncate(cap);
    }
    Ok(consolidated)
}

/// Watershed: edges become barriers, distance maxima become markers, and
/// the gradient magnitude orders the flooding.
fn watershed_pipeline(
    grid: &Grid,
    params: &SegmentationParams,
    tolerance: f64,
) -> Vec<RegionPolygon> {
    let smoothed = gaussian_blur(grid, 1.4);
    let (edges, magnitude) = canny(&smoothed, 0.1, 0.3);
    let barriers = morphology::dilate(&edges, 2);

    let has_edges = barriers.iter().any(|&e| e);
    let sure_foreground: Array2<bool> = if has_edges {
        let dist = chamfer_distance(&barriers);
        let max_dist = dist
            .iter()
            .cloned()
            .filter(|d| d.is_finite())
            .fold(0.0_f64, f64::max);
        let threshold = 0.3 * max_dist;
        dist.map(|&d| d.is_finite() && d >= threshold && d > 0.0)
    } else {
        // featureless image: single region covering the whole grid
        Array2::from_elem(grid.shape(), true)
    };

    let (markers, count) = label_regions(&sure_foreground, true);
    if count == 0 {
        return Vec::new();
    }

    let labels = watershed::flood(&magnitude, &markers);
    labeled_regions(&labels, count, 0.75, params, tolerance)
}

/// Edge detection: closed edge structures hulled into regions
fn edge_pipeline(grid: &Grid, params: &SegmentationParams, tolerance: f64) -> Vec<RegionPolygon> {
    let smoothed = gaussian_blur(grid, 1.4);
    let (edges, _) = canny(&smoothed, 0.08, 0.2);
    let closed = morphology::closing(&edges, 2);

    let (labels, count) = label_regions(&closed, true);
    let sizes = region_sizes(&labels, count);

    let mut regions = Vec::new();
    for label in 1..=count {
        if sizes[label] < 30 {
            continue;
        }
        let pixels: Vec<(usize, usize)> = labels
            .indexed_iter()
            .filter(|(_, &l)| l == label as i32)
            .map(|((r, c), _)| (r, c))
            .collect();
        let Some(hull) = convex_hull_polygon(&pixels) else {
            continue;
        };
        let simplified = hull.simplify(&tolerance);
        let area = simplified.unsigned_area();
        if area < params.min_area_pixels || area > params.max_area_pixels {
            continue;
        }
        regions.push(RegionPolygon {
            polygon: simplified,
            area_pixels: area,
            score: 0.70,
        });
    }
    regions
}

/// Stability ladder: threshold-stable masks become regions
fn stability_pipeline(
    grid: &Grid,
    params: &SegmentationParams,
    tolerance: f64,
) -> Vec<RegionPolygon> {
    let smoothed = gaussian_blur(grid, 1.0);
    let stability_params = StabilityParams {
        stability_threshold: params.stability_threshold,
        min_area: params.min_area_pixels.max(8.0) as usize,
        max_area: if params.max_area_pixels.is_finite() {
            params.max_area_pixels as usize
        } else {
            usize::MAX
        },
        ..Default::default()
    };

    let shape = smoothed.shape();
    let mut regions = Vec::new();
    for proposal in stable_masks(&smoothed, &stability_params) {
        let Some(outline) = component_outline(&proposal.pixels, shape) else {
            continue;
        };
        let Some(polygon) = outline_to_polygon(&outline) else {
            continue;
        };
        let simplified = polygon.simplify(&tolerance);
        let area = simplified.unsigned_area();
        if area < params.min_area_pixels || area > params.max_area_pixels {
            continue;
        }
        regions.push(RegionPolygon {
            polygon: simplified,
            area_pixels: area,
            score: proposal.stability,
        });
    }
    regions
}

/// Extract, simplify and filter polygons from a fully labeled grid
fn labeled_regions(
    labels: &Array2<i32>,
    count: usize,
    score: f64,
    params: &SegmentationParams,
    tolerance: f64,
) -> Vec<RegionPolygon> {
    let sizes = region_sizes(labels, count);
    let mut regions = Vec::new();
    for label in 1..=count {
        if sizes[label] < 8 {
            continue;
        }
        let Some(outline) = region_outline(labels, label as i32) else {
            continue;
        };
        let Some(polygon) = outline_to_polygon(&outline) else {
            continue;
        };
        let simplified = polygon.simplify(&tolerance);
        let area = simplified.unsigned_area();
        if area < params.min_area_pixels || area > params.max_area_pixels {
            continue;
        }
        regions.push(RegionPolygon {
            polygon: simplified,
            area_pixels: area,
            score,
        });
    }
    regions
}

/// Drop regions that mostly overlap an already accepted larger region
/// (intersection above 30 % of the candidate's area)
fn consolidate(mut regions: Vec<RegionPolygon>) -> Vec<RegionPolygon> {
    regions.sort_by(|a, b| b.area_pixels.total_cmp(&a.area_pixels));

    let mut accepted: Vec<RegionPolygon> = Vec::new();
    for candidate in regions {
        if candidate.area_pixels <= f64::EPSILON {
            continue;
        }
        let overlaps = accepted.iter().any(|kept| {
            let intersection = kept.polygon.intersection(&candidate.polygon);
            intersection.unsigned_area() / candidate.area_pixels > 0.3
        });
        if !overlaps {
            accepted.push(candidate);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Centroid, LineString};

    /// Two bright fields separated by a dark road grid
    fn two_field_grid() -> Grid {
        let mut grid = Grid::zeros(40, 40);
        for r in 2..38 {
            for c in 2..18 {
                grid.set(r, c, 0.9);
            }
            for c in 22..38 {
                grid.set(r, c, 0.6);
            }
        }
        grid
    }

    fn test_params() -> SegmentationParams {
        SegmentationParams {
            min_area_pixels: 40.0,
            max_area_pixels: 100_000.0,
            ..Default::default()
        }
    }

    #[test]
    fn watershed_separates_two_fields() {
        let grid = two_field_grid();
        let regions = segment(&grid, SegmentationAlgorithm::Watershed, &test_params()).unwrap();
        assert!(
            regions.len() >= 2,
            "expected at least two regions, got {}",
            regions.len()
        );
        // the two largest regions sit on opposite sides of the road
        let mut xs: Vec<f64> = regions
            .iter()
            .take(2)
            .filter_map(|r| r.polygon.centroid().map(|c| c.x()))
            .collect();
        xs.sort_by(f64::total_cmp);
        assert!(xs[0] < 20.0 && xs[1] > 20.0, "centroids: {:?}", xs);
    }

    #[test]
    fn sam_finds_stable_bright_field() {
        let mut grid = Grid::zeros(40, 40);
        for r in 5..35 {
            for c in 5..35 {
                grid.set(r, c, 1.0);
            }
        }
        let regions = segment(&grid, SegmentationAlgorithm::Sam, &test_params()).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(regions[0].score >= 0.9);
    }

    #[test]
    fn area_filter_drops_large_regions() {
        let grid = two_field_grid();
        let params = SegmentationParams {
            min_area_pixels: 40.0,
            max_area_pixels: 100.0,
            ..Default::default()
        };
        let regions = segment(&grid, SegmentationAlgorithm::Watershed, &params).unwrap();
        assert!(regions.iter().all(|r| r.area_pixels <= 100.0));
    }

    #[test]
    fn tiny_image_is_rejected() {
        let grid = Grid::zeros(4, 4);
        let err = segment(&grid, SegmentationAlgorithm::Watershed, &test_params()).unwrap_err();
        assert!(matches!(err, SegmentationError::ImageTooSmall { .. }));
    }

    #[test]
    fn consolidate_drops_contained_region() {
        let big = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (20.0, 0.0),
                (20.0, 20.0),
                (0.0, 20.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        let inner = Polygon::new(
            LineString::from(vec![
                (5.0, 5.0),
                (10.0, 5.0),
                (10.0, 10.0),
                (5.0, 10.0),
                (5.0, 5.0),
            ]),
            vec![],
        );
        let regions = vec![
            RegionPolygon {
                polygon: big,
                area_pixels: 400.0,
                score: 0.75,
            },
            RegionPolygon {
                polygon: inner,
                area_pixels: 25.0,
                score: 0.75,
            },
        ];
        let kept = consolidate(regions);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].area_pixels, 400.0);
    }

    #[test]
    fn algorithm_parse_falls_back_to_watershed() {
        assert_eq!(
            SegmentationAlgorithm::parse_or_default("SAM"),
            SegmentationAlgorithm::Sam
        );
        assert_eq!(
            SegmentationAlgorithm::parse_or_default("unknown"),
            SegmentationAlgorithm::Watershed
        );
    }
}
