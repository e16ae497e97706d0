//! GeoJSON geometry types and polygon operations
//!
//! The wire format follows GeoJSON (RFC 7946) for polygons and multi
//! polygons. Metric operations (area, simplification, intersection over
//! union) are delegated to the `geo` crate after conversion.

use geo::{Area, BooleanOps, Centroid, LineString, MultiPolygon, Polygon, Simplify};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Meters per degree of latitude (spherical approximation)
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Geometry validation errors
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("geometry has no rings")]
    Empty,
    #[error("ring has {0} points, at least 4 required")]
    TooFewPoints(usize),
    #[error("ring is not closed")]
    UnclosedRing,
    #[error("coordinate is not finite")]
    NonFiniteCoordinate,
}

/// GeoJSON geometry (polygonal subset)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

/// GeoJSON feature with free-form properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,
    pub properties: serde_json::Value,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: serde_json::Value) -> Self {
        Self {
            feature_type: feature_type(),
            properties,
            geometry,
        }
    }
}

/// GeoJSON feature collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: collection_type(),
            features,
        }
    }
}

impl Geometry {
    /// Build a polygon from a single exterior ring, closing it if needed
    pub fn polygon(mut ring: Vec<[f64; 2]>) -> Geometry {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Geometry::Polygon {
            coordinates: vec![ring],
        }
    }

    /// Validate ring structure: closed rings of at least 4 finite points
    pub fn validate(&self) -> Result<(), GeometryError> {
        let rings: Vec<&Vec<[f64; 2]>> = match self {
            Geometry::Polygon { coordinates } => coordinates.iter().collect(),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flat_map(|p| p.iter()).collect()
            }
        };
        if rings.is_empty() {
            return Err(GeometryError::Empty);
        }
        for ring in rings {
            if ring.len() < 4 {
                return Err(GeometryError::TooFewPoints(ring.len()));
            }
            if ring.first() != ring.last() {
                return Err(GeometryError::UnclosedRing);
            }
            if ring
                .iter()
                .any(|c| !c[0].is_finite() || !c[1].is_finite())
            {
                return Err(GeometryError::NonFiniteCoordinate);
            }
        }
        Ok(())
    }

    /// Convert to a `geo` multi polygon
    pub fn to_geo(&self) -> Result<MultiPolygon<f64>, GeometryError> {
        self.validate()?;
        let polygons = match self {
            Geometry::Polygon { coordinates } => vec![rings_to_polygon(coordinates)],
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().map(|p| rings_to_polygon(p)).collect()
            }
        };
        Ok(MultiPolygon(polygons))
    }

    /// Convert a `geo` polygon back to GeoJSON
    pub fn from_geo_polygon(polygon: &Polygon<f64>) -> Geometry {
        let mut coordinates = vec![ring_to_coords(polygon.exterior())];
        for interior in polygon.interiors() {
            coordinates.push(ring_to_coords(interior));
        }
        Geometry::Polygon { coordinates }
    }

    /// Exterior-ring point count across all polygons
    pub fn exterior_point_count(&self) -> usize {
        match self {
            Geometry::Polygon { coordinates } => {
                coordinates.first().map(|r| r.len()).unwrap_or(0)
            }
            Geometry::MultiPolygon { coordinates } => coordinates
                .iter()
                .filter_map(|p| p.first().map(|r| r.len()))
                .sum(),
        }
    }
}

fn rings_to_polygon(rings: &[Vec<[f64; 2]>]) -> Polygon<f64> {
    let exterior = coords_to_ring(&rings[0]);
    let interiors = rings[1..].iter().map(|r| coords_to_ring(r)).collect();
    Polygon::new(exterior, interiors)
}

fn coords_to_ring(coords: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(
        coords
            .iter()
            .map(|c| (c[0], c[1]))
            .collect::<Vec<(f64, f64)>>(),
    )
}

fn ring_to_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

/// Area in squared coordinate units (planar)
pub fn planar_area(geometry: &Geometry) -> Result<f64, GeometryError> {
    Ok(geometry.to_geo()?.unsigned_area())
}

/// Area in hectares for lon/lat geometries.
///
/// Uses an equirectangular projection scaled at the geometry's mean
/// latitude, adequate for field-sized polygons.
pub fn geodetic_area_hectares(geometry: &Geometry) -> Result<f64, GeometryError> {
    let multi = geometry.to_geo()?;
    let mean_lat = multi
        .centroid()
        .map(|c| c.y().to_radians())
        .unwrap_or(0.0);
    let meters_per_degree_lon = METERS_PER_DEGREE_LAT * mean_lat.cos();

    let projected = MultiPolygon(
        multi
            .0
            .iter()
            .map(|p| scale_polygon(p, meters_per_degree_lon, METERS_PER_DEGREE_LAT))
            .collect(),
    );
    Ok(projected.unsigned_area() / 10_000.0)
}

fn scale_polygon(polygon: &Polygon<f64>, sx: f64, sy: f64) -> Polygon<f64> {
    let scale_ring = |ring: &LineString<f64>| {
        LineString::from(
            ring.coords()
                .map(|c| (c.x * sx, c.y * sy))
                .collect::<Vec<(f64, f64)>>(),
        )
    };
    Polygon::new(
        scale_ring(polygon.exterior()),
        polygon.interiors().iter().map(scale_ring).collect(),
    )
}

/// Douglas-Peucker simplification with the given tolerance (coordinate units)
pub fn simplify(geometry: &Geometry, tolerance: f64) -> Result<Geometry, GeometryError> {
    let multi = geometry.to_geo()?;
    let simplified: Vec<Polygon<f64>> = multi.0.iter().map(|p| p.simplify(&tolerance)).collect();
    if simplified.len() == 1 {
        Ok(Geometry::from_geo_polygon(&simplified[0]))
    } else {
        Ok(Geometry::MultiPolygon {
            coordinates: simplified
                .iter()
                .map(|p| {
                    let mut rings = vec![ring_to_coords(p.exterior())];
                    rings.extend(p.interiors().iter().map(ring_to_coords));
                    rings
                })
                .collect(),
        })
    }
}

/// Centroid as [lon, lat] (or [x, y] in planar space)
pub fn centroid(geometry: &Geometry) -> Result<Option<[f64; 2]>, GeometryError> {
    Ok(geometry.to_geo()?.centroid().map(|p| [p.x(), p.y()]))
}

/// Intersection over union of two geometries.
///
/// Returns a value in [0, 1]; disjoint geometries yield 0 and identical
/// geometries 1. Degenerate (zero-area) inputs yield 0.
pub fn intersection_over_union(a: &Geometry, b: &Geometry) -> Result<f64, GeometryError> {
    let ga = a.to_geo()?;
    let gb = b.to_geo()?;

    let intersection_area = ga.intersection(&gb).unsigned_area();
    let union_area = ga.union(&gb).unsigned_area();

    if union_area <= f64::EPSILON {
        return Ok(0.0);
    }
    Ok((intersection_area / union_area).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::polygon(vec![
            [x0, y0],
            [x0 + size, y0],
            [x0 + size, y0 + size],
            [x0, y0 + size],
        ])
    }

    #[test]
    fn polygon_constructor_closes_ring() {
        let geom = square(0.0, 0.0, 1.0);
        assert!(geom.validate().is_ok());
        if let Geometry::Polygon { coordinates } = &geom {
            assert_eq!(coordinates[0].first(), coordinates[0].last());
            assert_eq!(coordinates[0].len(), 5);
        } else {
            panic!("expected polygon");
        }
    }

    #[test]
    fn validate_rejects_short_ring() {
        let geom = Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]],
        };
        assert_eq!(geom.validate(), Err(GeometryError::TooFewPoints(3)));
    }

    #[test]
    fn validate_rejects_nan() {
        let geom = Geometry::Polygon {
            coordinates: vec![vec![
                [0.0, 0.0],
                [1.0, f64::NAN],
                [1.0, 1.0],
                [0.0, 0.0],
            ]],
        };
        assert_eq!(geom.validate(), Err(GeometryError::NonFiniteCoordinate));
    }

    #[test]
    fn planar_area_of_unit_square() {
        let area = planar_area(&square(0.0, 0.0, 1.0)).unwrap();
        assert!((area - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iou_identical_is_one() {
        let a = square(0.0, 0.0, 10.0);
        let iou = intersection_over_union(&a, &a.clone()).unwrap();
        assert!((iou - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_disjoint_is_zero() {
        let a = square(0.0, 0.0, 1.0);
        let b = square(5.0, 5.0, 1.0);
        assert_eq!(intersection_over_union(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn iou_half_overlap() {
        // two unit squares sharing half their area: I=0.5, U=1.5
        let a = square(0.0, 0.0, 1.0);
        let b = square(0.5, 0.0, 1.0);
        let iou = intersection_over_union(&a, &b).unwrap();
        assert!((iou - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn geojson_serialization_shape() {
        let feature = Feature::new(
            square(0.0, 0.0, 1.0),
            serde_json::json!({"id": "field_0"}),
        );
        let value = serde_json::to_value(&feature).unwrap();
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Polygon");
        assert!(value["geometry"]["coordinates"].is_array());

        let back: Feature = serde_json::from_value(value).unwrap();
        assert_eq!(back.geometry, feature.geometry);
    }

    #[test]
    fn simplify_reduces_points() {
        // square with redundant collinear points on each edge
        let geom = Geometry::polygon(vec![
            [0.0, 0.0],
            [5.0, 0.0],
            [10.0, 0.0],
            [10.0, 5.0],
            [10.0, 10.0],
            [5.0, 10.0],
            [0.0, 10.0],
            [0.0, 5.0],
        ]);
        let simplified = simplify(&geom, 0.1).unwrap();
        assert!(simplified.exterior_point_count() < geom.exterior_point_count());
        let area_before = planar_area(&geom).unwrap();
        let area_after = planar_area(&simplified).unwrap();
        assert!((area_before - area_after).abs() < 1e-6);
    }

    #[test]
    fn geodetic_area_of_known_square() {
        // ~0.001 degree square at the equator: ~111.32 m per side
        let geom = square(-46.6, 0.0, 0.001);
        let hectares = geodetic_area_hectares(&geom).unwrap();
        let expected = (111.32_f64 * 111.32) / 10_000.0;
        assert!((hectares - expected).abs() / expected < 0.01);
    }
}
