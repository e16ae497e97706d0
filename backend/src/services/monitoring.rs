//! Monitoring service: the consolidated map view
//!
//! Aggregates a field's boundary, its geolocated inspections, and the
//! recent NDVI scenes from the Earth Engine microservice. When the
//! microservice is unreachable the NDVI layer degrades to offline mode
//! with an empty scene list.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::gee::{GeeClient, SceneInfo};
use crate::services::field::{FieldRecord, FieldService, FieldSummary};

/// NDVI scene lookback for the map
const SCENE_LOOKBACK_DAYS: i64 = 90;

/// Inspections shown per field
const MAX_INSPECTIONS: i64 = 50;

/// Monitoring service
#[derive(Clone)]
pub struct MonitoringService {
    db: PgPool,
    gee: GeeClient,
    fields: FieldService,
}

/// A geolocated inspection pin
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InspectionPin {
    pub id: Uuid,
    pub category: String,
    pub severity: String,
    pub status: String,
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
    pub crop: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// NDVI layer: recent scenes or offline fallback
#[derive(Debug, Serialize)]
pub struct NdviLayer {
    pub mode: String,
    pub images: Vec<SceneInfo>,
}

/// Consolidated layers for one field
#[derive(Debug, Serialize)]
pub struct MonitoringLayers {
    pub field: FieldRecord,
    pub inspections: Vec<InspectionPin>,
    pub ndvi: NdviLayer,
}

/// Occurrence counts by severity
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}

/// Farm overview for the map sidebar
#[derive(Debug, Serialize)]
pub struct FarmOverview {
    pub farm_id: Uuid,
    pub name: String,
    pub field_count: i64,
    pub total_area_hectares: f64,
    pub occurrences_by_severity: Vec<SeverityCount>,
}

#[derive(Debug, sqlx::FromRow)]
struct FarmRow {
    name: String,
    field_count: i64,
    total_area_hectares: Option<f64>,
}

impl MonitoringService {
    /// Create a new MonitoringService instance
    pub fn new(db: PgPool, gee: GeeClient) -> Self {
        let fields = FieldService::new(db.clone());
        Self { db, gee, fields }
    }

    /// Consolidated layers for a field
    pub async fn layers(&self, field_id: Uuid) -> AppResult<MonitoringLayers> {
        let field = self.fields.get_field(field_id).await?;

        let inspections = sqlx::query_as::<_, InspectionPin>(
            r#"
            SELECT id, category, severity, status, latitude, longitude,
                   notes, crop, created_at
            FROM inspections
            WHERE (field_id = $1 OR farm_id = $2)
              AND latitude IS NOT NULL AND longitude IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(field_id)
        .bind(field.farm_id)
        .bind(MAX_INSPECTIONS)
        .fetch_all(&self.db)
        .await?;

        let ndvi = match FieldService::boundary_geometry(&field) {
            Ok(boundary) => {
                let end: NaiveDate = Utc::now().date_naive();
                let start = end - Duration::days(SCENE_LOOKBACK_DAYS);
                match self.gee.list_images(&boundary, start, end).await {
                    Ok(images) => NdviLayer {
                        mode: "live".to_string(),
                        images,
                    },
                    Err(error) => {
                        tracing::warn!(%field_id, %error, "NDVI service unreachable, offline mode");
                        NdviLayer {
                            mode: "offline".to_string(),
                            images: Vec::new(),
                        }
                    }
                }
            }
            // no boundary recorded yet: nothing to query scenes for
            Err(_) => NdviLayer {
                mode: "offline".to_string(),
                images: Vec::new(),
            },
        };

        Ok(MonitoringLayers {
            field,
            inspections,
            ndvi,
        })
    }

    /// Fields for the map, optionally restricted to one farm
    pub async fn fields(&self, farm_id: Option<Uuid>) -> AppResult<Vec<FieldSummary>> {
        self.fields.list_fields(farm_id).await
    }

    /// Farm overview with recent occurrence counts
    pub async fn farm_overview(&self, farm_id: Uuid) -> AppResult<FarmOverview> {
        let farm = sqlx::query_as::<_, FarmRow>(
            r#"
            SELECT fa.name,
                   COUNT(f.id) AS field_count,
                   COALESCE(SUM(f.area_hectares), 0) AS total_area_hectares
            FROM farms fa
            LEFT JOIN fields f ON f.farm_id = fa.id
            WHERE fa.id = $1
            GROUP BY fa.id, fa.name
            "#,
        )
        .bind(farm_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| crate::error::AppError::NotFound("Farm".to_string()))?;

        let occurrences = sqlx::query_as::<_, SeverityCount>(
            r#"
            SELECT severity, COUNT(*) AS count
            FROM occurrences
            WHERE farm_id = $1 AND reported_at > NOW() - INTERVAL '90 days'
            GROUP BY severity
            ORDER BY severity
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(FarmOverview {
            farm_id,
            name: farm.name,
            field_count: farm.field_count,
            total_area_hectares: farm.total_area_hectares.unwrap_or(0.0),
            occurrences_by_severity: occurrences,
        })
    }
}
