//! HTTP handlers for meteorology and GDD endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::weather::{CurrentConditions, DailyForecast, WeatherClient};
use crate::middleware::CurrentUser;
use crate::services::field::FieldService;
use crate::services::gdd::{BatchGddItem, BatchGddResult, GddReport, GddService};
use crate::AppState;
use shared::validation::validate_coordinates;

fn service(state: &AppState) -> GddService {
    let weather = WeatherClient::new(
        state.config.weather.forecast_url.clone(),
        state.config.weather.archive_url.clone(),
        state.config.weather.timezone.clone(),
    );
    GddService::new(state.db.clone(), weather)
}

fn check_coordinates(latitude: f64, longitude: f64) -> AppResult<()> {
    validate_coordinates(latitude, longitude).map_err(|msg| AppError::Validation {
        field: "coordinates".to_string(),
        message: msg.to_string(),
        message_pt: "Coordenadas inválidas".to_string(),
    })
}

/// Query parameters for a GDD report
#[derive(Debug, Deserialize)]
pub struct GddQuery {
    pub planting_date: NaiveDate,
    pub crop: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// GDD report for a field. Coordinates default to the field centroid.
pub async fn get_gdd(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(field_id): Path<Uuid>,
    Query(query): Query<GddQuery>,
) -> AppResult<Json<GddReport>> {
    let (latitude, longitude) = match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            let fields = FieldService::new(state.db.clone());
            let field = fields.get_field(field_id).await?;
            FieldService::field_centroid(&field)?
        }
    };
    check_coordinates(latitude, longitude)?;

    let report = service(&state)
        .compute_report(field_id, &query.crop, query.planting_date, latitude, longitude)
        .await?;
    Ok(Json(report))
}

/// Supported crops with stage tables
pub async fn list_gdd_crops() -> Json<Vec<serde_json::Value>> {
    Json(GddService::supported_crops())
}

/// Batch GDD input
#[derive(Debug, Deserialize)]
pub struct BatchGddInput {
    pub fields: Vec<BatchGddItem>,
}

/// GDD for multiple fields
pub async fn batch_gdd(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<BatchGddInput>,
) -> AppResult<Json<Vec<BatchGddResult>>> {
    if input.fields.is_empty() {
        return Err(AppError::ValidationError(
            "fields cannot be empty".to_string(),
        ));
    }
    let results = service(&state).compute_batch(input.fields).await;
    Ok(Json(results))
}

/// Query parameters for weather by location
#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub lat: f64,
    pub lon: f64,
    pub days: Option<u8>,
}

/// Current conditions at a location
pub async fn current_weather(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<CurrentConditions>> {
    check_coordinates(query.lat, query.lon)?;
    let conditions = service(&state)
        .current_conditions(query.lat, query.lon)
        .await?;
    Ok(Json(conditions))
}

/// Daily forecast at a location
pub async fn weather_forecast(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<LocationQuery>,
) -> AppResult<Json<Vec<DailyForecast>>> {
    check_coordinates(query.lat, query.lon)?;
    let forecast = service(&state)
        .cached_forecast(query.lat, query.lon, query.days.unwrap_or(7))
        .await?;
    Ok(Json(forecast))
}
