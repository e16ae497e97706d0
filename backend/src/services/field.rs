//! Field data access shared by the monitoring, index, productivity and
//! delineation services
//!
//! Fields are not exposed through a generic CRUD surface; this service
//! covers the lookups those subsystems need plus persistence of
//! auto-detected boundaries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::geometry::{centroid, Geometry};
use shared::FarmRole;

/// Field lookup service
#[derive(Clone)]
pub struct FieldService {
    db: PgPool,
}

/// Field row with farm and season context
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FieldRecord {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub season_id: Option<Uuid>,
    pub name: String,
    pub area_hectares: Option<f64>,
    pub soil_type: Option<String>,
    pub status: String,
    pub boundary: Option<serde_json::Value>,
    pub centroid_latitude: Option<f64>,
    pub centroid_longitude: Option<f64>,
    pub productivity_zone: Option<String>,
    pub detection_algorithm: Option<String>,
    pub detection_score: Option<f64>,
    pub detected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub farm_name: Option<String>,
    pub season_name: Option<String>,
    pub season_crop: Option<String>,
}

/// Compact field summary for map listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FieldSummary {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub name: String,
    pub area_hectares: Option<f64>,
    pub status: String,
    pub productivity_zone: Option<String>,
    pub centroid_latitude: Option<f64>,
    pub centroid_longitude: Option<f64>,
    pub boundary: Option<serde_json::Value>,
}

const FIELD_SELECT: &str = r#"
    SELECT f.id, f.farm_id, f.season_id, f.name, f.area_hectares, f.soil_type,
           f.status, f.boundary, f.centroid_latitude, f.centroid_longitude,
           f.productivity_zone, f.detection_algorithm, f.detection_score,
           f.detected_at, f.created_at, f.updated_at,
           fa.name AS farm_name, s.name AS season_name, s.crop AS season_crop
    FROM fields f
    LEFT JOIN farms fa ON fa.id = f.farm_id
    LEFT JOIN seasons s ON s.id = f.season_id
"#;

impl FieldService {
    /// Create a new FieldService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a field with its farm/season context
    pub async fn get_field(&self, field_id: Uuid) -> AppResult<FieldRecord> {
        let field = sqlx::query_as::<_, FieldRecord>(&format!("{} WHERE f.id = $1", FIELD_SELECT))
            .bind(field_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Field".to_string()))?;
        Ok(field)
    }

    /// List fields, optionally restricted to one farm
    pub async fn list_fields(&self, farm_id: Option<Uuid>) -> AppResult<Vec<FieldSummary>> {
        let base = r#"
            SELECT id, farm_id, name, area_hectares, status, productivity_zone,
                   centroid_latitude, centroid_longitude, boundary
            FROM fields
        "#;
        let fields = match farm_id {
            Some(farm_id) => {
                sqlx::query_as::<_, FieldSummary>(&format!(
                    "{} WHERE farm_id = $1 ORDER BY name ASC",
                    base
                ))
                .bind(farm_id)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, FieldSummary>(&format!("{} ORDER BY name ASC", base))
                    .fetch_all(&self.db)
                    .await?
            }
        };
        Ok(fields)
    }

    /// Parse the stored boundary GeoJSON of a field
    pub fn boundary_geometry(field: &FieldRecord) -> AppResult<Geometry> {
        let raw = field
            .boundary
            .as_ref()
            .ok_or_else(|| AppError::InvalidGeometry("field has no boundary".to_string()))?;
        let geometry: Geometry = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
        geometry
            .validate()
            .map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
        Ok(geometry)
    }

    /// Centroid of a field: stored columns, falling back to the boundary
    pub fn field_centroid(field: &FieldRecord) -> AppResult<(f64, f64)> {
        if let (Some(lat), Some(lon)) = (field.centroid_latitude, field.centroid_longitude) {
            return Ok((lat, lon));
        }
        let geometry = Self::boundary_geometry(field)?;
        let point = centroid(&geometry)
            .map_err(|e| AppError::InvalidGeometry(e.to_string()))?
            .ok_or_else(|| AppError::InvalidGeometry("empty boundary".to_string()))?;
        Ok((point[1], point[0]))
    }

    /// Require that a user holds at least the given role on a farm.
    /// The farm owner implicitly holds the owner role.
    pub async fn require_farm_role(
        &self,
        user_id: Uuid,
        farm_id: Uuid,
        required: FarmRole,
    ) -> AppResult<()> {
        let owner_id = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM farms WHERE id = $1")
            .bind(farm_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Farm".to_string()))?;

        if owner_id == user_id {
            return Ok(());
        }

        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM farm_members WHERE farm_id = $1 AND user_id = $2",
        )
        .bind(farm_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        let granted = role
            .and_then(|r| FarmRole::parse(&r))
            .map(|r| r.at_least(required))
            .unwrap_or(false);
        if !granted {
            return Err(AppError::InsufficientPermissions);
        }
        Ok(())
    }

    /// Persist auto-detected fields for a farm
    pub async fn insert_detected_field(
        &self,
        farm_id: Uuid,
        name: &str,
        boundary: &Geometry,
        area_hectares: f64,
        algorithm: &str,
        score: f64,
    ) -> AppResult<Uuid> {
        let center = centroid(boundary).map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
        let boundary_json = serde_json::to_value(boundary)
            .map_err(|e| AppError::Internal(format!("boundary serialization failed: {}", e)))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO fields (
                farm_id, name, area_hectares, status, boundary,
                centroid_latitude, centroid_longitude,
                detection_algorithm, detection_score, detected_at
            )
            VALUES ($1, $2, $3, 'detected_auto', $4, $5, $6, $7, $8, NOW())
            RETURNING id
            "#,
        )
        .bind(farm_id)
        .bind(name)
        .bind(area_hectares)
        .bind(&boundary_json)
        .bind(center.map(|c| c[1]))
        .bind(center.map(|c| c[0]))
        .bind(algorithm)
        .bind(score)
        .fetch_one(&self.db)
        .await?;
        Ok(id)
    }

    /// Replace a field boundary after a manual adjustment
    pub async fn update_boundary(
        &self,
        field_id: Uuid,
        boundary: &Geometry,
        area_hectares: f64,
    ) -> AppResult<()> {
        let center = centroid(boundary).map_err(|e| AppError::InvalidGeometry(e.to_string()))?;
        let boundary_json = serde_json::to_value(boundary)
            .map_err(|e| AppError::Internal(format!("boundary serialization failed: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE fields
            SET boundary = $1, area_hectares = $2,
                centroid_latitude = $3, centroid_longitude = $4,
                status = 'adjusted', updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&boundary_json)
        .bind(area_hectares)
        .bind(center.map(|c| c[1]))
        .bind(center.map(|c| c[0]))
        .bind(field_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Field".to_string()));
        }
        Ok(())
    }
}
