//! Vegetation index service
//!
//! Proxies NDVI/NDRE/MSAVI computation to the Earth Engine microservice,
//! caching zonal statistics per field and period so repeated map loads do
//! not hit the upstream service.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::gee::{GeeClient, IndexStatistics};
use crate::services::field::FieldService;
use shared::{IndexInfo, VegetationIndex};

/// Snapshots younger than this are served from the database
const SNAPSHOT_MAX_AGE_HOURS: i64 = 6;

/// Default lookback window when no period is given
const DEFAULT_PERIOD_DAYS: i64 = 30;

/// Default maximum scene cloud coverage (%)
pub const DEFAULT_MAX_CLOUD: u8 = 20;

/// Vegetation index service
#[derive(Clone)]
pub struct IndicesService {
    db: PgPool,
    gee: GeeClient,
    fields: FieldService,
}

/// Index computation result for a field
#[derive(Debug, Clone, Serialize)]
pub struct FieldIndexReport {
    pub field_id: Uuid,
    pub index: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_cloud_coverage: u8,
    pub tile_url: String,
    pub statistics: IndexStatistics,
    pub scale_meters: u32,
    pub cached: bool,
    pub computed_at: DateTime<Utc>,
}

/// Side-by-side comparison of all indices with a recommendation
#[derive(Debug, Serialize)]
pub struct IndexComparison {
    pub field_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub indices: Vec<FieldIndexReport>,
    pub recommended_index: String,
    pub recommendation_reason: String,
}

#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    tile_url: String,
    mean: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    std_dev: Option<f64>,
    scale_meters: i32,
    computed_at: DateTime<Utc>,
}

/// Resolve the requested period, defaulting to the last 30 days
pub fn resolve_period(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let end = end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = start_date.unwrap_or(end - Duration::days(DEFAULT_PERIOD_DAYS));
    shared::validation::validate_date_range(start, end).map_err(|msg| AppError::Validation {
        field: "start_date".to_string(),
        message: msg.to_string(),
        message_pt: "A data inicial não pode ser posterior à final".to_string(),
    })?;
    Ok((start, end))
}

/// Pick the most informative index for the observed canopy density.
/// Sparse canopies suffer from soil background (MSAVI), dense canopies
/// saturate NDVI (NDRE).
pub fn recommend_index(ndvi_mean: Option<f64>) -> (VegetationIndex, &'static str) {
    match ndvi_mean {
        Some(mean) if mean < 0.3 => (
            VegetationIndex::Msavi,
            "Sparse vegetation with exposed soil; MSAVI corrects soil background",
        ),
        Some(mean) if mean > 0.75 => (
            VegetationIndex::Ndre,
            "Dense canopy where NDVI saturates; NDRE stays sensitive",
        ),
        _ => (
            VegetationIndex::Ndvi,
            "Canopy in the NDVI-responsive range",
        ),
    }
}

impl IndicesService {
    /// Create a new IndicesService instance
    pub fn new(db: PgPool, gee: GeeClient) -> Self {
        let fields = FieldService::new(db.clone());
        Self { db, gee, fields }
    }

    /// Catalog of supported indices
    pub fn catalog() -> Vec<IndexInfo> {
        VegetationIndex::ALL.iter().map(|i| i.info()).collect()
    }

    /// Compute (or serve cached) index statistics for a field
    pub async fn field_index(
        &self,
        field_id: Uuid,
        index: VegetationIndex,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_cloud_coverage: u8,
    ) -> AppResult<FieldIndexReport> {
        if let Some(cached) = self
            .cached_snapshot(field_id, index, start_date, end_date, max_cloud_coverage)
            .await?
        {
            return Ok(cached);
        }

        let field = self.fields.get_field(field_id).await?;
        let geometry = FieldService::boundary_geometry(&field)?;

        let result = self
            .gee
            .compute_index(
                &geometry,
                index.as_str(),
                start_date,
                end_date,
                max_cloud_coverage,
            )
            .await?;

        let computed_at = Utc::now();

        // cache writes are best effort
        let _ = sqlx::query(
            r#"
            INSERT INTO index_snapshots (
                field_id, index_code, start_date, end_date, max_cloud_coverage,
                tile_url, mean, min, max, std_dev, scale_meters, computed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(field_id)
        .bind(index.as_str())
        .bind(start_date)
        .bind(end_date)
        .bind(max_cloud_coverage as i32)
        .bind(&result.tile_url)
        .bind(result.statistics.mean)
        .bind(result.statistics.min)
        .bind(result.statistics.max)
        .bind(result.statistics.std_dev)
        .bind(result.scale_meters as i32)
        .bind(computed_at)
        .execute(&self.db)
        .await;

        Ok(FieldIndexReport {
            field_id,
            index: index.as_str().to_string(),
            start_date,
            end_date,
            max_cloud_coverage,
            tile_url: result.tile_url,
            statistics: result.statistics,
            scale_meters: result.scale_meters,
            cached: false,
            computed_at,
        })
    }

    /// All three indices side by side plus a recommendation
    pub async fn compare(
        &self,
        field_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_cloud_coverage: u8,
    ) -> AppResult<IndexComparison> {
        let mut reports = Vec::with_capacity(VegetationIndex::ALL.len());
        for index in VegetationIndex::ALL {
            let report = self
                .field_index(field_id, index, start_date, end_date, max_cloud_coverage)
                .await?;
            reports.push(report);
        }

        let ndvi_mean = reports
            .iter()
            .find(|r| r.index == VegetationIndex::Ndvi.as_str())
            .and_then(|r| r.statistics.mean);
        let (recommended, reason) = recommend_index(ndvi_mean);

        Ok(IndexComparison {
            field_id,
            start_date,
            end_date,
            indices: reports,
            recommended_index: recommended.as_str().to_string(),
            recommendation_reason: reason.to_string(),
        })
    }

    async fn cached_snapshot(
        &self,
        field_id: Uuid,
        index: VegetationIndex,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_cloud_coverage: u8,
    ) -> AppResult<Option<FieldIndexReport>> {
        let cutoff = Utc::now() - Duration::hours(SNAPSHOT_MAX_AGE_HOURS);
        let row = sqlx::query_as::<_, SnapshotRow>(
            r#"
            SELECT tile_url, mean, min, max, std_dev, scale_meters, computed_at
            FROM index_snapshots
            WHERE field_id = $1 AND index_code = $2
              AND start_date = $3 AND end_date = $4
              AND max_cloud_coverage = $5
              AND computed_at > $6
            ORDER BY computed_at DESC
            LIMIT 1
            "#,
        )
        .bind(field_id)
        .bind(index.as_str())
        .bind(start_date)
        .bind(end_date)
        .bind(max_cloud_coverage as i32)
        .bind(cutoff)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| FieldIndexReport {
            field_id,
            index: index.as_str().to_string(),
            start_date,
            end_date,
            max_cloud_coverage,
            tile_url: row.tile_url,
            statistics: IndexStatistics {
                mean: row.mean,
                min: row.min,
                max: row.max,
                std_dev: row.std_dev,
            },
            scale_meters: row.scale_meters as u32,
            cached: true,
            computed_at: row.computed_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_tracks_canopy_density() {
        assert_eq!(recommend_index(Some(0.2)).0, VegetationIndex::Msavi);
        assert_eq!(recommend_index(Some(0.5)).0, VegetationIndex::Ndvi);
        assert_eq!(recommend_index(Some(0.8)).0, VegetationIndex::Ndre);
        assert_eq!(recommend_index(None).0, VegetationIndex::Ndvi);
    }

    #[test]
    fn period_defaults_to_last_30_days() {
        let (start, end) = resolve_period(None, None).unwrap();
        assert_eq!(end - start, Duration::days(30));
    }

    #[test]
    fn period_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert!(resolve_period(Some(start), Some(end)).is_err());
    }
}
