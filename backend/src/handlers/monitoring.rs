//! HTTP handlers for monitoring endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::external::gee::GeeClient;
use crate::middleware::CurrentUser;
use crate::services::field::FieldSummary;
use crate::services::monitoring::{FarmOverview, MonitoringLayers, MonitoringService};
use crate::AppState;

fn service(state: &AppState) -> MonitoringService {
    let gee = GeeClient::new(
        state.config.gee.service_url.clone(),
        state.config.gee.timeout_seconds,
    );
    MonitoringService::new(state.db.clone(), gee)
}

/// Consolidated map layers for a field
pub async fn monitoring_layers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
) -> AppResult<Json<MonitoringLayers>> {
    let layers = service(&state).layers(field_id).await?;
    Ok(Json(layers))
}

/// Query parameters for the field listing
#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    pub farm_id: Option<Uuid>,
}

/// Fields for the map
pub async fn monitoring_fields(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<FieldsQuery>,
) -> AppResult<Json<Vec<FieldSummary>>> {
    let fields = service(&state).fields(query.farm_id).await?;
    Ok(Json(fields))
}

/// Farm overview for the map sidebar
pub async fn farm_overview(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<FarmOverview>> {
    let overview = service(&state).farm_overview(farm_id).await?;
    Ok(Json(overview))
}
