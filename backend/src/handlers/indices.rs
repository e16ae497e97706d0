//! HTTP handlers for vegetation index endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::gee::GeeClient;
use crate::middleware::CurrentUser;
use crate::services::indices::{
    resolve_period, FieldIndexReport, IndexComparison, IndicesService, DEFAULT_MAX_CLOUD,
};
use crate::AppState;
use shared::{IndexInfo, VegetationIndex};

/// Query parameters for index computation
#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_cloud: Option<u8>,
}

fn service(state: &AppState) -> IndicesService {
    let gee = GeeClient::new(
        state.config.gee.service_url.clone(),
        state.config.gee.timeout_seconds,
    );
    IndicesService::new(state.db.clone(), gee)
}

fn max_cloud(query: &IndexQuery) -> AppResult<u8> {
    let value = query.max_cloud.unwrap_or(DEFAULT_MAX_CLOUD);
    shared::validation::validate_cloud_coverage(value).map_err(|msg| AppError::Validation {
        field: "max_cloud".to_string(),
        message: msg.to_string(),
        message_pt: "Cobertura de nuvens deve estar entre 0 e 100".to_string(),
    })?;
    Ok(value)
}

/// Catalog of supported indices
pub async fn list_indices() -> Json<Vec<IndexInfo>> {
    Json(IndicesService::catalog())
}

/// NDVI for a field
pub async fn get_ndvi(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Json<FieldIndexReport>> {
    index_for(state, field_id, VegetationIndex::Ndvi, query).await
}

/// NDRE for a field
pub async fn get_ndre(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Json<FieldIndexReport>> {
    index_for(state, field_id, VegetationIndex::Ndre, query).await
}

/// MSAVI for a field
pub async fn get_msavi(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Json<FieldIndexReport>> {
    index_for(state, field_id, VegetationIndex::Msavi, query).await
}

async fn index_for(
    state: AppState,
    field_id: Uuid,
    index: VegetationIndex,
    query: IndexQuery,
) -> AppResult<Json<FieldIndexReport>> {
    let (start, end) = resolve_period(query.start_date, query.end_date)?;
    let cloud = max_cloud(&query)?;
    let report = service(&state)
        .field_index(field_id, index, start, end, cloud)
        .await?;
    Ok(Json(report))
}

/// All indices side by side with a recommendation
pub async fn compare_indices(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Json<IndexComparison>> {
    let (start, end) = resolve_period(query.start_date, query.end_date)?;
    let cloud = max_cloud(&query)?;
    let comparison = service(&state)
        .compare(field_id, start, end, cloud)
        .await?;
    Ok(Json(comparison))
}
