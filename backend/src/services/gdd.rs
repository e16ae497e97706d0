//! Growing degree days and meteorology service
//!
//! Computes accumulated GDD since planting from the Open-Meteo archive,
//! projects the next days from the forecast, maps accumulation onto the
//! crop's phenological stage table and estimates the harvest window.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::weather::{CurrentConditions, DailyForecast, DailyTemperature, WeatherClient};
use shared::{Crop, PhenologicalStage};

/// Upper temperature cap for GDD accumulation (°C)
const GDD_TMAX_CAP: f64 = 30.0;

/// Alert when the next stage is projected within this many days
const STAGE_ALERT_DAYS: usize = 3;

/// Forecast cache lifetime
const FORECAST_CACHE_HOURS: i64 = 3;

/// GDD and meteorology service
#[derive(Clone)]
pub struct GddService {
    db: PgPool,
    weather: WeatherClient,
}

/// Daily GDD entry (historical)
#[derive(Debug, Clone, Serialize)]
pub struct DailyGdd {
    pub date: NaiveDate,
    pub tmax_celsius: f64,
    pub tmin_celsius: f64,
    pub gdd_day: f64,
    pub gdd_accumulated: f64,
}

/// Daily GDD entry projected from the forecast
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedGdd {
    pub date: NaiveDate,
    pub tmax_celsius: f64,
    pub tmin_celsius: f64,
    pub gdd_day: f64,
    pub gdd_accumulated_projected: f64,
}

/// A phenological stage in the report
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub name: String,
    pub gdd_threshold: f64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gdd_remaining: Option<f64>,
}

/// Stage-imminent alert
#[derive(Debug, Clone, Serialize)]
pub struct StageAlert {
    pub kind: String,
    pub level: String,
    pub stage: String,
    pub message: String,
    pub days_remaining: usize,
    pub gdd_remaining: f64,
}

/// Estimated harvest window
#[derive(Debug, Clone, Serialize)]
pub struct HarvestEstimate {
    pub estimated_days: i64,
    pub estimated_date: NaiveDate,
}

/// Full GDD report for a field
#[derive(Debug, Clone, Serialize)]
pub struct GddReport {
    pub field_id: Uuid,
    pub crop: String,
    pub base_temperature_celsius: f64,
    pub planting_date: NaiveDate,
    pub current_date: NaiveDate,
    pub days_since_planting: usize,
    pub gdd_accumulated: f64,
    pub daily: Vec<DailyGdd>,
    pub projection_7_days: Vec<ProjectedGdd>,
    pub current_stage: Option<StageReport>,
    pub next_stage: Option<StageReport>,
    pub alerts: Vec<StageAlert>,
    pub harvest_estimate: Option<HarvestEstimate>,
}

/// One item of a batch GDD request
#[derive(Debug, Deserialize)]
pub struct BatchGddItem {
    pub field_id: Uuid,
    pub planting_date: NaiveDate,
    pub crop: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Batch result: report or per-item error
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchGddResult {
    Ok(Box<GddReport>),
    Err { field_id: Uuid, error: String },
}

/// Cached forecast row
#[derive(Debug, sqlx::FromRow)]
struct ForecastCacheRow {
    payload: serde_json::Value,
}

/// Daily GDD: mean of the capped extremes above the base temperature.
/// Tmax is capped at 30 °C and Tmin floored at the base temperature.
pub fn daily_gdd(tmax: f64, tmin: f64, tbase: f64) -> f64 {
    let tmax_capped = tmax.min(GDD_TMAX_CAP);
    let tmin_floored = tmin.max(tbase);
    let mean = (tmax_capped + tmin_floored) / 2.0;
    round1((mean - tbase).max(0.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Accumulate daily GDD over a historical series
pub fn accumulate(history: &[DailyTemperature], tbase: f64) -> (Vec<DailyGdd>, f64) {
    let mut accumulated = 0.0;
    let mut entries = Vec::with_capacity(history.len());
    for day in history {
        let gdd = daily_gdd(day.tmax_celsius, day.tmin_celsius, tbase);
        accumulated += gdd;
        entries.push(DailyGdd {
            date: day.date,
            tmax_celsius: day.tmax_celsius,
            tmin_celsius: day.tmin_celsius,
            gdd_day: gdd,
            gdd_accumulated: round1(accumulated),
        });
    }
    (entries, round1(accumulated))
}

/// Project accumulation over the forecast days
pub fn project(forecast: &[DailyForecast], tbase: f64, start_accumulated: f64) -> Vec<ProjectedGdd> {
    let mut accumulated = start_accumulated;
    forecast
        .iter()
        .map(|day| {
            let gdd = daily_gdd(day.tmax_celsius, day.tmin_celsius, tbase);
            accumulated += gdd;
            ProjectedGdd {
                date: day.date,
                tmax_celsius: day.tmax_celsius,
                tmin_celsius: day.tmin_celsius,
                gdd_day: gdd,
                gdd_accumulated_projected: round1(accumulated),
            }
        })
        .collect()
}

/// Current stage (highest threshold reached) and the following stage
pub fn current_and_next_stage(
    stages: &[PhenologicalStage],
    accumulated: f64,
) -> (Option<&PhenologicalStage>, Option<&PhenologicalStage>) {
    let mut current = None;
    let mut next = None;
    for (i, stage) in stages.iter().enumerate() {
        if accumulated >= stage.gdd_threshold {
            current = Some(stage);
            next = stages.get(i + 1);
        }
    }
    if current.is_none() {
        next = stages.first();
    }
    (current, next)
}

/// Alert when the projection reaches the next stage within a few days
pub fn stage_alerts(
    next_stage: Option<&PhenologicalStage>,
    projection: &[ProjectedGdd],
    accumulated: f64,
) -> Vec<StageAlert> {
    let mut alerts = Vec::new();
    if let Some(stage) = next_stage {
        let reached = projection
            .iter()
            .position(|p| p.gdd_accumulated_projected >= stage.gdd_threshold);
        if let Some(index) = reached {
            if index < STAGE_ALERT_DAYS {
                let days = index + 1;
                alerts.push(StageAlert {
                    kind: "stage_imminent".to_string(),
                    level: "info".to_string(),
                    stage: stage.name.to_string(),
                    message: format!("{} expected in about {} day(s)", stage.name, days),
                    days_remaining: days,
                    gdd_remaining: round1(stage.gdd_threshold - accumulated),
                });
            }
        }
    }
    alerts
}

/// Estimate days to harvest from the mean daily accumulation so far
pub fn harvest_estimate(
    stages: &[PhenologicalStage],
    accumulated: f64,
    days_elapsed: usize,
    today: NaiveDate,
) -> Option<HarvestEstimate> {
    let final_stage = stages.last()?;
    if days_elapsed == 0 || accumulated <= 0.0 {
        return None;
    }
    let mean_daily = accumulated / days_elapsed as f64;
    let remaining = (final_stage.gdd_threshold - accumulated).max(0.0);
    let days = (remaining / mean_daily).ceil() as i64;
    Some(HarvestEstimate {
        estimated_days: days,
        estimated_date: today + Duration::days(days),
    })
}

impl GddService {
    /// Create a new GddService instance
    pub fn new(db: PgPool, weather: WeatherClient) -> Self {
        Self { db, weather }
    }

    /// Full GDD report for a field
    pub async fn compute_report(
        &self,
        field_id: Uuid,
        crop_name: &str,
        planting_date: NaiveDate,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<GddReport> {
        let crop = Crop::parse(crop_name)
            .ok_or_else(|| AppError::UnsupportedCrop(crop_name.to_string()))?;
        let tbase = crop.base_temperature();
        let today = Utc::now().date_naive();

        if planting_date > today {
            return Err(AppError::Validation {
                field: "planting_date".to_string(),
                message: "Planting date cannot be in the future".to_string(),
                message_pt: "A data de plantio não pode estar no futuro".to_string(),
            });
        }

        let history = self
            .weather
            .get_historical_temperatures(latitude, longitude, planting_date, today)
            .await?;
        let (daily, accumulated) = accumulate(&history, tbase);

        let forecast = self.cached_forecast(latitude, longitude, 7).await?;
        let projection = project(&forecast, tbase, accumulated);

        let stages = crop.phenological_stages();
        let (current, next) = current_and_next_stage(stages, accumulated);
        let alerts = stage_alerts(next, &projection, accumulated);
        let harvest = harvest_estimate(stages, accumulated, daily.len(), today);

        Ok(GddReport {
            field_id,
            crop: crop.as_str().to_string(),
            base_temperature_celsius: tbase,
            planting_date,
            current_date: today,
            days_since_planting: daily.len(),
            gdd_accumulated: accumulated,
            daily,
            projection_7_days: projection,
            current_stage: current.map(|s| stage_report(s, None)),
            next_stage: next.map(|s| stage_report(s, Some(round1(s.gdd_threshold - accumulated)))),
            alerts,
            harvest_estimate: harvest,
        })
    }

    /// GDD reports for multiple fields; failures reported per item
    pub async fn compute_batch(&self, items: Vec<BatchGddItem>) -> Vec<BatchGddResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            match self
                .compute_report(
                    item.field_id,
                    &item.crop,
                    item.planting_date,
                    item.latitude,
                    item.longitude,
                )
                .await
            {
                Ok(report) => results.push(BatchGddResult::Ok(Box::new(report))),
                Err(error) => results.push(BatchGddResult::Err {
                    field_id: item.field_id,
                    error: error.to_string(),
                }),
            }
        }
        results
    }

    /// Current conditions at a location
    pub async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<CurrentConditions> {
        self.weather.get_current_conditions(latitude, longitude).await
    }

    /// Daily forecast, cached in the database for a few hours
    pub async fn cached_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> AppResult<Vec<DailyForecast>> {
        let cached = sqlx::query_as::<_, ForecastCacheRow>(
            r#"
            SELECT payload
            FROM forecast_cache
            WHERE ABS(latitude - $1) < 0.01
              AND ABS(longitude - $2) < 0.01
              AND days = $3
              AND expires_at > NOW()
            ORDER BY fetched_at DESC
            LIMIT 1
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(days as i32)
        .fetch_optional(&self.db)
        .await?;

        if let Some(row) = cached {
            if let Ok(forecast) = serde_json::from_value::<Vec<DailyForecast>>(row.payload) {
                return Ok(forecast);
            }
        }

        let forecast = self
            .weather
            .get_daily_forecast(latitude, longitude, days)
            .await?;

        let payload = serde_json::to_value(&forecast)
            .map_err(|e| AppError::Internal(format!("forecast serialization failed: {}", e)))?;
        let expires_at: DateTime<Utc> = Utc::now() + Duration::hours(FORECAST_CACHE_HOURS);

        // cache writes are best effort
        let _ = sqlx::query(
            r#"
            INSERT INTO forecast_cache (latitude, longitude, days, payload, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(days as i32)
        .bind(&payload)
        .bind(expires_at)
        .execute(&self.db)
        .await;

        Ok(forecast)
    }

    /// Supported crops with base temperatures and stage tables
    pub fn supported_crops() -> Vec<serde_json::Value> {
        Crop::ALL
            .iter()
            .map(|crop| {
                serde_json::json!({
                    "id": crop.as_str(),
                    "name": crop.display_name(),
                    "base_temperature_celsius": crop.base_temperature(),
                    "stages": crop.phenological_stages(),
                })
            })
            .collect()
    }
}

fn stage_report(stage: &PhenologicalStage, gdd_remaining: Option<f64>) -> StageReport {
    StageReport {
        name: stage.name.to_string(),
        gdd_threshold: stage.gdd_threshold,
        description: stage.description.to_string(),
        gdd_remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temps(days: &[(f64, f64)]) -> Vec<DailyTemperature> {
        days.iter()
            .enumerate()
            .map(|(i, &(tmax, tmin))| DailyTemperature {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(i as i64),
                tmax_celsius: tmax,
                tmin_celsius: tmin,
            })
            .collect()
    }

    #[test]
    fn daily_gdd_basic() {
        // (25 + 15) / 2 - 10 = 10
        assert_eq!(daily_gdd(25.0, 15.0, 10.0), 10.0);
    }

    #[test]
    fn daily_gdd_caps_tmax() {
        // tmax capped at 30: (30 + 20) / 2 - 10 = 15
        assert_eq!(daily_gdd(40.0, 20.0, 10.0), 15.0);
    }

    #[test]
    fn daily_gdd_floors_tmin_at_base() {
        // tmin floored at 10: (20 + 10) / 2 - 10 = 5
        assert_eq!(daily_gdd(20.0, 2.0, 10.0), 5.0);
    }

    #[test]
    fn daily_gdd_never_negative() {
        assert_eq!(daily_gdd(8.0, 2.0, 10.0), 0.0);
        assert_eq!(daily_gdd(-5.0, -10.0, 10.0), 0.0);
    }

    #[test]
    fn accumulation_is_monotone() {
        let history = temps(&[(25.0, 15.0), (28.0, 18.0), (22.0, 12.0)]);
        let (daily, total) = accumulate(&history, 10.0);
        assert_eq!(daily.len(), 3);
        for pair in daily.windows(2) {
            assert!(pair[1].gdd_accumulated >= pair[0].gdd_accumulated);
        }
        assert_eq!(total, daily.last().unwrap().gdd_accumulated);
    }

    #[test]
    fn stage_lookup_picks_highest_reached() {
        let stages = Crop::Corn.phenological_stages();
        let (current, next) = current_and_next_stage(stages, 900.0);
        assert_eq!(current.unwrap().name, "Flowering (R1)");
        assert_eq!(next.unwrap().name, "Grain fill (R3)");
    }

    #[test]
    fn stage_lookup_before_emergence() {
        let stages = Crop::Corn.phenological_stages();
        let (current, next) = current_and_next_stage(stages, 50.0);
        assert!(current.is_none());
        assert_eq!(next.unwrap().name, "Emergence");
    }

    #[test]
    fn stage_lookup_past_maturity() {
        let stages = Crop::Corn.phenological_stages();
        let (current, next) = current_and_next_stage(stages, 2000.0);
        assert_eq!(current.unwrap().name, "Physiological maturity (R6)");
        assert!(next.is_none());
    }

    #[test]
    fn alert_fires_when_stage_is_imminent() {
        let stages = Crop::Corn.phenological_stages();
        let accumulated = 790.0;
        let (_, next) = current_and_next_stage(stages, accumulated);
        // flowering at 800 is 10 GDD away; day one projects past it
        let forecast = vec![DailyForecast {
            date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            tmax_celsius: 30.0,
            tmin_celsius: 20.0,
            precipitation_mm: 0.0,
            weather_code: 0,
        }];
        let projection = project(&forecast, 10.0, accumulated);
        let alerts = stage_alerts(next, &projection, accumulated);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].days_remaining, 1);
        assert_eq!(alerts[0].stage, "Flowering (R1)");
    }

    #[test]
    fn no_alert_when_stage_is_distant() {
        let stages = Crop::Corn.phenological_stages();
        let accumulated = 400.0;
        let (_, next) = current_and_next_stage(stages, accumulated);
        let forecast: Vec<DailyForecast> = (0..7)
            .map(|i| DailyForecast {
                date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap() + Duration::days(i),
                tmax_celsius: 22.0,
                tmin_celsius: 12.0,
                precipitation_mm: 0.0,
                weather_code: 0,
            })
            .collect();
        let projection = project(&forecast, 10.0, accumulated);
        let alerts = stage_alerts(next, &projection, accumulated);
        assert!(alerts.is_empty());
    }

    #[test]
    fn harvest_estimate_uses_mean_daily_rate() {
        let stages = Crop::Corn.phenological_stages();
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        // 700 GDD in 70 days: 10 per day, 700 remaining to 1400
        let estimate = harvest_estimate(stages, 700.0, 70, today).unwrap();
        assert_eq!(estimate.estimated_days, 70);
        assert_eq!(estimate.estimated_date, today + Duration::days(70));
    }

    #[test]
    fn harvest_estimate_zero_days_when_mature() {
        let stages = Crop::Corn.phenological_stages();
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let estimate = harvest_estimate(stages, 1500.0, 120, today).unwrap();
        assert_eq!(estimate.estimated_days, 0);
        assert_eq!(estimate.estimated_date, today);
    }
}
