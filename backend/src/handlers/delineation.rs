//! HTTP handlers for auto-delineation endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::delineation::{
    AdjustBoundaryInput, AlgorithmInfo, BoundaryAdjustment, ClassifyZonesInput, DelineateInput,
    DelineationResult, DelineationService, ExportInput, ExportResult, ZoneClassificationResult,
};
use crate::AppState;

/// Run auto-delineation for a farm
pub async fn delineate_fields(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DelineateInput>,
) -> AppResult<Json<DelineationResult>> {
    let service = DelineationService::new(state.db);
    let result = service
        .delineate(current_user.0.user_id, input, false)
        .await?;
    Ok(Json(result))
}

/// Preview delineation without persisting anything
pub async fn preview_delineation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DelineateInput>,
) -> AppResult<Json<DelineationResult>> {
    let service = DelineationService::new(state.db);
    let result = service
        .delineate(current_user.0.user_id, input, true)
        .await?;
    Ok(Json(result))
}

/// Classify productivity zones from NDVI history
pub async fn classify_zones(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<ClassifyZonesInput>,
) -> AppResult<Json<ZoneClassificationResult>> {
    let service = DelineationService::new(state.db);
    let result = service.classify_zones(input)?;
    Ok(Json(result))
}

/// Manually adjust a field boundary
pub async fn adjust_boundary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Json(input): Json<AdjustBoundaryInput>,
) -> AppResult<Json<BoundaryAdjustment>> {
    let service = DelineationService::new(state.db);
    let result = service
        .adjust_boundary(current_user.0.user_id, field_id, input)
        .await?;
    Ok(Json(result))
}

/// Export features as GeoJSON or KML
pub async fn export_fields(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<ExportInput>,
) -> AppResult<Json<ExportResult>> {
    let service = DelineationService::new(state.db);
    let result = service.export(input)?;
    Ok(Json(result))
}

/// Available segmentation algorithms
pub async fn list_algorithms() -> Json<Vec<AlgorithmInfo>> {
    Json(DelineationService::algorithms())
}
