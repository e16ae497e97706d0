//! HTTP handlers for productivity endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::productivity::{
    ProductivityReport, ProductivityService, RecordYieldInput, SeasonComparison, SeasonFeatures,
    SeasonHistory,
};
use crate::AppState;

/// Query parameters for an estimate
#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub season: String,
    pub crop: String,
    pub ndvi_mean: Option<f64>,
    pub gdd_total: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

/// Estimate productivity for a field and season
pub async fn estimate_productivity(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<EstimateQuery>,
) -> AppResult<Json<ProductivityReport>> {
    let override_features = query.ndvi_mean.map(|ndvi| SeasonFeatures {
        ndvi_mean: ndvi,
        gdd_total: query.gdd_total.unwrap_or(0.0),
        precipitation_mm: query.precipitation_mm.unwrap_or(0.0),
    });

    let service = ProductivityService::new(state.db);
    let report = service
        .estimate(field_id, &query.season, &query.crop, override_features)
        .await?;
    Ok(Json(report))
}

/// Supported crops
pub async fn list_productivity_crops() -> Json<Vec<serde_json::Value>> {
    Json(ProductivityService::supported_crops())
}

/// Query parameters for history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub crop: Option<String>,
    pub seasons: Option<i64>,
}

/// Season history for a field
pub async fn productivity_history(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<SeasonHistory>>> {
    let service = ProductivityService::new(state.db);
    let history = service
        .history(
            field_id,
            query.crop.as_deref(),
            query.seasons.unwrap_or(3).clamp(1, 20),
        )
        .await?;
    Ok(Json(history))
}

/// Query parameters for a two-season comparison
#[derive(Debug, Deserialize)]
pub struct CompareSeasonsQuery {
    pub season_a: String,
    pub season_b: String,
}

/// Compare two seasons of the same field
pub async fn compare_seasons(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<CompareSeasonsQuery>,
) -> AppResult<Json<SeasonComparison>> {
    let service = ProductivityService::new(state.db);
    let comparison = service
        .compare_seasons(field_id, &query.season_a, &query.season_b)
        .await?;
    Ok(Json(comparison))
}

/// Record observed yield and season metrics
pub async fn record_yield(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<RecordYieldInput>,
) -> AppResult<Json<SeasonHistory>> {
    let service = ProductivityService::new(state.db);
    let record = service.record_yield(input).await?;
    Ok(Json(record))
}
