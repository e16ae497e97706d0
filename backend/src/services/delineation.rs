//! Auto-delineation service
//!
//! Orchestrates the segmentation pipeline: acquires the satellite raster,
//! runs the selected algorithm, converts pixel polygons to GeoJSON
//! features, scores the result against the IoU target and optionally
//! persists detected fields. Also handles productivity-zone
//! classification, manual boundary adjustment and geometry export.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::segmentation::raster::{decode_geotiff, Extent, Grid};
use crate::segmentation::zones::classify_zones;
use crate::segmentation::{
    segment, RegionPolygon, SegmentationAlgorithm, SegmentationParams,
};
use crate::services::field::FieldService;
use shared::geometry::{
    geodetic_area_hectares, intersection_over_union, Feature, FeatureCollection, Geometry,
};
use shared::{FarmRole, ProductivityZone};

/// IoU target against manual delineation
pub const IOU_TARGET: f64 = 0.75;

/// Region cap applied to interactive previews
const PREVIEW_MAX_REGIONS: usize = 25;

/// Default ground resolution of the input imagery (meters per pixel)
const DEFAULT_RESOLUTION_METERS: f64 = 10.0;

/// Delineation service
#[derive(Clone)]
pub struct DelineationService {
    fields: FieldService,
    http: reqwest::Client,
}

/// Geographic extent of the input image
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ExtentInput {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<ExtentInput> for Extent {
    fn from(value: ExtentInput) -> Self {
        Extent {
            west: value.west,
            south: value.south,
            east: value.east,
            north: value.north,
        }
    }
}

/// Input for auto-delineation
#[derive(Debug, Deserialize)]
pub struct DelineateInput {
    pub farm_id: Uuid,
    pub algorithm: Option<String>,
    /// GeoTIFF fetched from a URL
    pub image_url: Option<String>,
    /// GeoTIFF embedded as base64
    pub image_base64: Option<String>,
    /// Inline intensity grid (row-major)
    pub grid: Option<Vec<Vec<f64>>>,
    pub extent: Option<ExtentInput>,
    pub resolution_meters: Option<f64>,
    pub min_area_pixels: Option<f64>,
    pub max_area_pixels: Option<f64>,
    pub simplify_tolerance: Option<f64>,
    /// Reference geometries for measured IoU
    pub ground_truth: Option<Vec<Geometry>>,
    /// Persist detected fields (requires manager role)
    pub persist: Option<bool>,
}

/// Input for zone classification
#[derive(Debug, Deserialize)]
pub struct ClassifyZonesInput {
    /// One NDVI grid per year, identical shapes
    pub ndvi_history: Vec<Vec<Vec<f64>>>,
    pub extent: Option<ExtentInput>,
    pub min_region_pixels: Option<usize>,
}

/// Input for manual boundary adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustBoundaryInput {
    pub boundary: Geometry,
}

/// Input for geometry export
#[derive(Debug, Deserialize)]
pub struct ExportInput {
    pub features: FeatureCollection,
    pub format: Option<String>,
}

/// IoU report: measured against a reference, or the algorithm benchmark
#[derive(Debug, Clone, Serialize)]
pub struct IouReport {
    pub value: f64,
    pub target: f64,
    pub target_met: bool,
    pub method: String,
}

/// Aggregate metadata of a delineation run
#[derive(Debug, Serialize)]
pub struct DelineationMetadata {
    pub total_area_hectares: f64,
    pub mean_area_hectares: f64,
    pub resolution_meters: f64,
    pub image_rows: usize,
    pub image_cols: usize,
}

/// Result of a delineation run
#[derive(Debug, Serialize)]
pub struct DelineationResult {
    pub farm_id: Uuid,
    pub algorithm: String,
    pub fields: FeatureCollection,
    pub total_fields: usize,
    pub iou: IouReport,
    pub elapsed_ms: u128,
    pub metadata: DelineationMetadata,
    pub persisted_field_ids: Vec<Uuid>,
}

/// Zone classification result
#[derive(Debug, Serialize)]
pub struct ZoneClassificationResult {
    pub zones: ZoneBuckets,
    pub statistics: ZoneStatistics,
}

#[derive(Debug, Serialize)]
pub struct ZoneBuckets {
    pub low: Vec<Feature>,
    pub medium: Vec<Feature>,
    pub high: Vec<Feature>,
}

#[derive(Debug, Serialize)]
pub struct ZoneStatistics {
    pub total_regions: usize,
    pub low_regions: usize,
    pub medium_regions: usize,
    pub high_regions: usize,
    pub high_share_percent: f64,
}

/// Result of a manual boundary adjustment
#[derive(Debug, Serialize)]
pub struct BoundaryAdjustment {
    pub field_id: Uuid,
    pub area_hectares: f64,
    pub iou_with_previous: Option<f64>,
    pub status: String,
}

/// Exported document
#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub content_type: String,
    pub extension: String,
    pub data: String,
}

/// Algorithm catalog entry
#[derive(Debug, Serialize)]
pub struct AlgorithmInfo {
    pub id: String,
    pub description: String,
    pub benchmark_iou: f64,
    pub default: bool,
}

impl DelineationService {
    /// Create a new DelineationService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            fields: FieldService::new(db),
            http: reqwest::Client::new(),
        }
    }

    /// Run auto-delineation for a farm
    pub async fn delineate(
        &self,
        user_id: Uuid,
        input: DelineateInput,
        preview: bool,
    ) -> AppResult<DelineationResult> {
        let started = Instant::now();
        let persist = !preview && input.persist.unwrap_or(false);

        // viewers may run previews; persisting needs the manager role
        let required_role = if persist {
            FarmRole::Manager
        } else {
            FarmRole::Viewer
        };
        self.fields
            .require_farm_role(user_id, input.farm_id, required_role)
            .await?;

        let algorithm = SegmentationAlgorithm::parse_or_default(
            input.algorithm.as_deref().unwrap_or_default(),
        );
        let resolution = input
            .resolution_meters
            .unwrap_or(DEFAULT_RESOLUTION_METERS);
        if resolution <= 0.0 {
            return Err(AppError::Validation {
                field: "resolution_meters".to_string(),
                message: "Resolution must be positive".to_string(),
                message_pt: "A resolução deve ser positiva".to_string(),
            });
        }

        let (grid, tiff_extent) = self.acquire_grid(&input).await?;
        let extent: Option<Extent> = input.extent.map(Extent::from).or(tiff_extent);

        let mut params = SegmentationParams::default();
        if let Some(min) = input.min_area_pixels {
            params.min_area_pixels = min;
        }
        if let Some(max) = input.max_area_pixels {
            params.max_area_pixels = max;
        }
        params.simplify_tolerance = input.simplify_tolerance;
        if preview {
            params.max_regions = Some(PREVIEW_MAX_REGIONS);
        }

        let regions = segment(&grid, algorithm, &params)
            .map_err(|e| AppError::SegmentationFailed(e.to_string()))?;

        let (rows, cols) = grid.shape();
        tracing::info!(
            farm_id = %input.farm_id,
            algorithm = algorithm.as_str(),
            regions = regions.len(),
            "delineation segmentation finished"
        );

        let geometries: Vec<Geometry> = regions
            .iter()
            .map(|region| region_geometry(region, extent.as_ref(), rows, cols))
            .collect();

        let mut total_area_ha = 0.0;
        let mut features = Vec::with_capacity(regions.len());
        for (index, (region, geometry)) in regions.iter().zip(&geometries).enumerate() {
            let area_ha = pixels_to_hectares(region.area_pixels, resolution);
            total_area_ha += area_ha;
            features.push(Feature::new(
                geometry.clone(),
                serde_json::json!({
                    "id": format!("field_{}_{}", input.farm_id, index),
                    "farm_id": input.farm_id,
                    "index": index,
                    "area_pixels": region.area_pixels,
                    "area_hectares": round2(area_ha),
                    "score": round2(region.score),
                    "status": "detected_auto",
                }),
            ));
        }

        let iou = self.score_iou(&geometries, input.ground_truth.as_deref(), algorithm)?;

        let mut persisted_field_ids = Vec::new();
        if persist {
            for (index, (region, geometry)) in regions.iter().zip(&geometries).enumerate() {
                let area_ha = pixels_to_hectares(region.area_pixels, resolution);
                let name = format!("Detected field {}", index + 1);
                let id = self
                    .fields
                    .insert_detected_field(
                        input.farm_id,
                        &name,
                        geometry,
                        round2(area_ha),
                        algorithm.as_str(),
                        region.score,
                    )
                    .await?;
                persisted_field_ids.push(id);
            }
        }

        let total_fields = features.len();
        let mean_area = if total_fields > 0 {
            total_area_ha / total_fields as f64
        } else {
            0.0
        };

        Ok(DelineationResult {
            farm_id: input.farm_id,
            algorithm: algorithm.as_str().to_string(),
            fields: FeatureCollection::new(features),
            total_fields,
            iou,
            elapsed_ms: started.elapsed().as_millis(),
            metadata: DelineationMetadata {
                total_area_hectares: round2(total_area_ha),
                mean_area_hectares: round2(mean_area),
                resolution_meters: resolution,
                image_rows: rows,
                image_cols: cols,
            },
            persisted_field_ids,
        })
    }

    /// Classify productivity zones from a multi-year NDVI history
    pub fn classify_zones(&self, input: ClassifyZonesInput) -> AppResult<ZoneClassificationResult> {
        if input.ndvi_history.is_empty() {
            return Err(AppError::Validation {
                field: "ndvi_history".to_string(),
                message: "NDVI history cannot be empty".to_string(),
                message_pt: "O histórico de NDVI não pode ser vazio".to_string(),
            });
        }

        let grids: Vec<Grid> = input
            .ndvi_history
            .into_iter()
            .map(Grid::from_rows)
            .collect::<Result<_, _>>()
            .map_err(|e| AppError::SegmentationFailed(e.to_string()))?;
        let (rows, cols) = grids[0].shape();
        let extent: Option<Extent> = input.extent.map(Extent::from);

        let min_region = input.min_region_pixels.unwrap_or(500);
        let regions = classify_zones(&grids, min_region)
            .map_err(|e| AppError::SegmentationFailed(e.to_string()))?;

        let mut buckets = ZoneBuckets {
            low: Vec::new(),
            medium: Vec::new(),
            high: Vec::new(),
        };
        for region in &regions {
            let geometry = polygon_geometry(&region.polygon, extent.as_ref(), rows, cols);
            let feature = Feature::new(
                geometry,
                serde_json::json!({
                    "productivity_zone": region.zone.as_str(),
                    "color": region.zone.color(),
                    "label": region.zone.label(),
                    "mean_ndvi": round3(region.mean_ndvi),
                    "area_pixels": region.area_pixels,
                }),
            );
            match region.zone {
                ProductivityZone::Low => buckets.low.push(feature),
                ProductivityZone::Medium => buckets.medium.push(feature),
                ProductivityZone::High => buckets.high.push(feature),
            }
        }

        let total = regions.len();
        let high_share = if total > 0 {
            buckets.high.len() as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Ok(ZoneClassificationResult {
            statistics: ZoneStatistics {
                total_regions: total,
                low_regions: buckets.low.len(),
                medium_regions: buckets.medium.len(),
                high_regions: buckets.high.len(),
                high_share_percent: round2(high_share),
            },
            zones: buckets,
        })
    }

    /// Manually adjust a field boundary, measuring IoU against the
    /// previous geometry
    pub async fn adjust_boundary(
        &self,
        user_id: Uuid,
        field_id: Uuid,
        input: AdjustBoundaryInput,
    ) -> AppResult<BoundaryAdjustment> {
        shared::validation::validate_boundary(&input.boundary)
            .map_err(|msg| AppError::InvalidGeometry(msg.to_string()))?;

        let field = self.fields.get_field(field_id).await?;
        self.fields
            .require_farm_role(user_id, field.farm_id, FarmRole::Manager)
            .await?;

        let iou_with_previous = match FieldService::boundary_geometry(&field) {
            Ok(previous) => Some(
                intersection_over_union(&previous, &input.boundary)
                    .map_err(|e| AppError::InvalidGeometry(e.to_string()))?,
            ),
            Err(_) => None,
        };

        let area_hectares = geodetic_area_hectares(&input.boundary)
            .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;

        self.fields
            .update_boundary(field_id, &input.boundary, round2(area_hectares))
            .await?;

        Ok(BoundaryAdjustment {
            field_id,
            area_hectares: round2(area_hectares),
            iou_with_previous: iou_with_previous.map(round3),
            status: "adjusted".to_string(),
        })
    }

    /// Export features as GeoJSON or KML
    pub fn export(&self, input: ExportInput) -> AppResult<ExportResult> {
        let format = input.format.as_deref().unwrap_or("geojson");
        match format {
            "geojson" => {
                let data = serde_json::to_string_pretty(&input.features)
                    .map_err(|e| AppError::Internal(format!("GeoJSON export failed: {}", e)))?;
                Ok(ExportResult {
                    content_type: "application/geo+json".to_string(),
                    extension: "geojson".to_string(),
                    data,
                })
            }
            "kml" => Ok(ExportResult {
                content_type: "application/vnd.google-earth.kml+xml".to_string(),
                extension: "kml".to_string(),
                data: build_kml(&input.features),
            }),
            other => Err(AppError::Validation {
                field: "format".to_string(),
                message: format!("Unsupported format: {}. Use: geojson, kml", other),
                message_pt: format!("Formato não suportado: {}. Use: geojson, kml", other),
            }),
        }
    }

    /// Catalog of available algorithms
    pub fn algorithms() -> Vec<AlgorithmInfo> {
        SegmentationAlgorithm::ALL
            .iter()
            .map(|algorithm| AlgorithmInfo {
                id: algorithm.as_str().to_string(),
                description: algorithm.description().to_string(),
                benchmark_iou: algorithm.benchmark_iou(),
                default: *algorithm == SegmentationAlgorithm::default(),
            })
            .collect()
    }

    /// Acquire the input grid: inline grid, base64 GeoTIFF or URL
    async fn acquire_grid(
        &self,
        input: &DelineateInput,
    ) -> AppResult<(Grid, Option<Extent>)> {
        if let Some(rows) = &input.grid {
            let grid = Grid::from_rows(rows.clone())
                .map_err(|e| AppError::SegmentationFailed(e.to_string()))?;
            return Ok((grid, None));
        }
        if let Some(encoded) = &input.image_base64 {
            let bytes = general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| AppError::Validation {
                    field: "image_base64".to_string(),
                    message: format!("Invalid base64 image: {}", e),
                    message_pt: "Imagem base64 inválida".to_string(),
                })?;
            return decode_geotiff(&bytes)
                .map_err(|e| AppError::SegmentationFailed(e.to_string()));
        }
        if let Some(url) = &input.image_url {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| AppError::ExternalService(format!("image download failed: {}", e)))?;
            if !response.status().is_success() {
                return Err(AppError::ExternalService(format!(
                    "image download failed with status {}",
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AppError::ExternalService(format!("image download failed: {}", e)))?;
            return decode_geotiff(&bytes)
                .map_err(|e| AppError::SegmentationFailed(e.to_string()));
        }
        Err(AppError::Validation {
            field: "image".to_string(),
            message: "Provide grid, image_base64 or image_url".to_string(),
            message_pt: "Informe grid, image_base64 ou image_url".to_string(),
        })
    }

    /// Measured IoU when a reference is available, benchmark otherwise
    fn score_iou(
        &self,
        detected: &[Geometry],
        ground_truth: Option<&[Geometry]>,
        algorithm: SegmentationAlgorithm,
    ) -> AppResult<IouReport> {
        let (value, method) = match ground_truth {
            Some(truth) if !truth.is_empty() && !detected.is_empty() => {
                let detected_multi = merge_geometries(detected)
                    .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
                let truth_multi = merge_geometries(truth)
                    .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
                let iou = intersection_over_union(&detected_multi, &truth_multi)
                    .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
                (iou, "measured")
            }
            _ => (algorithm.benchmark_iou(), "benchmark"),
        };

        Ok(IouReport {
            value: round3(value),
            target: IOU_TARGET,
            target_met: value >= IOU_TARGET,
            method: method.to_string(),
        })
    }
}

/// Merge polygonal geometries into one multi polygon
fn merge_geometries(
    geometries: &[Geometry],
) -> Result<Geometry, shared::geometry::GeometryError> {
    let mut coordinates = Vec::new();
    for geometry in geometries {
        geometry.validate()?;
        match geometry {
            Geometry::Polygon { coordinates: rings } => coordinates.push(rings.clone()),
            Geometry::MultiPolygon {
                coordinates: polygons,
            } => coordinates.extend(polygons.clone()),
        }
    }
    Ok(Geometry::MultiPolygon { coordinates })
}

/// Convert a pixel-space region to GeoJSON, mapping through the extent
/// when one is known
fn region_geometry(
    region: &RegionPolygon,
    extent: Option<&Extent>,
    rows: usize,
    cols: usize,
) -> Geometry {
    polygon_geometry(&region.polygon, extent, rows, cols)
}

fn polygon_geometry(
    polygon: &geo::Polygon<f64>,
    extent: Option<&Extent>,
    rows: usize,
    cols: usize,
) -> Geometry {
    let ring: Vec<[f64; 2]> = polygon
        .exterior()
        .coords()
        .map(|c| match extent {
            Some(extent) => extent.pixel_to_lonlat(rows, cols, c.x, c.y),
            None => [c.x, c.y],
        })
        .collect();
    Geometry::polygon(ring)
}

/// Pixel area to hectares at the given ground resolution
pub fn pixels_to_hectares(pixels: f64, resolution_meters: f64) -> f64 {
    pixels * resolution_meters * resolution_meters / 10_000.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Build a KML document with productivity-zone styles
pub fn build_kml(features: &FeatureCollection) -> String {
    let mut kml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
    <name>AgroFocus fields</name>
    <Style id="low">
        <PolyStyle><color>ff6B6BFF</color><fill>1</fill><outline>1</outline></PolyStyle>
    </Style>
    <Style id="medium">
        <PolyStyle><color>ff3DD9FF</color><fill>1</fill><outline>1</outline></PolyStyle>
    </Style>
    <Style id="high">
        <PolyStyle><color>ff77CB6B</color><fill>1</fill><outline>1</outline></PolyStyle>
    </Style>
"#,
    );

    for (index, feature) in features.features.iter().enumerate() {
        let zone = feature
            .properties
            .get("productivity_zone")
            .and_then(|v| v.as_str())
            .unwrap_or("medium");
        let name = feature
            .properties
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("Field_{}", index));

        let ring = match &feature.geometry {
            Geometry::Polygon { coordinates } => coordinates.first().cloned(),
            Geometry::MultiPolygon { coordinates } => {
                coordinates.first().and_then(|p| p.first().cloned())
            }
        };
        let Some(ring) = ring else { continue };
        let coordinates = ring
            .iter()
            .map(|c| format!("{},{},0", c[0], c[1]))
            .collect::<Vec<_>>()
            .join(" ");

        kml.push_str(&format!(
            r#"
    <Placemark>
        <name>{}</name>
        <styleUrl>#{}</styleUrl>
        <Polygon>
            <outerBoundaryIs>
                <LinearRing>
                    <coordinates>
                        {}
                    </coordinates>
                </LinearRing>
            </outerBoundaryIs>
        </Polygon>
    </Placemark>"#,
            name, zone, coordinates
        ));
    }

    kml.push_str("\n</Document>\n</kml>");
    kml
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_feature(zone: &str) -> Feature {
        Feature::new(
            Geometry::polygon(vec![
                [-46.6, -23.5],
                [-46.59, -23.5],
                [-46.59, -23.49],
                [-46.6, -23.49],
            ]),
            serde_json::json!({"id": "field_a", "productivity_zone": zone}),
        )
    }

    #[test]
    fn pixels_to_hectares_at_ten_meters() {
        // 10_000 px at 10 m resolution = 1_000_000 m² = 100 ha
        assert_eq!(pixels_to_hectares(10_000.0, 10.0), 100.0);
    }

    #[test]
    fn kml_contains_every_feature_and_styles() {
        let collection =
            FeatureCollection::new(vec![square_feature("high"), square_feature("low")]);
        let kml = build_kml(&collection);
        assert!(kml.starts_with("<?xml"));
        assert_eq!(kml.matches("<Placemark>").count(), 2);
        assert!(kml.contains("styleUrl>#high"));
        assert!(kml.contains("styleUrl>#low"));
        assert!(kml.contains("-46.6,-23.5,0"));
        assert!(kml.ends_with("</kml>"));
    }

    #[test]
    fn merge_geometries_flattens_polygons() {
        let a = Geometry::polygon(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let b = Geometry::polygon(vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0]]);
        let merged = merge_geometries(&[a, b]).unwrap();
        match merged {
            Geometry::MultiPolygon { coordinates } => assert_eq!(coordinates.len(), 2),
            _ => panic!("expected multi polygon"),
        }
    }
}
