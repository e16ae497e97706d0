//! Weather API client for fetching temperature and precipitation data
//!
//! Integrates with Open-Meteo: the forecast API for current conditions and
//! daily forecasts, and the archive API for historical daily temperatures.
//! Open-Meteo requires no API key.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    forecast_url: String,
    archive_url: String,
    timezone: String,
}

/// Daily temperature record (historical or forecast)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub date: NaiveDate,
    pub tmax_celsius: f64,
    pub tmin_celsius: f64,
}

/// Daily forecast record with precipitation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub tmax_celsius: f64,
    pub tmin_celsius: f64,
    pub precipitation_mm: f64,
    pub weather_code: i32,
}

/// Current weather conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_celsius: f64,
    pub relative_humidity_percent: f64,
    pub precipitation_mm: f64,
    pub weather_code: i32,
    pub wind_speed_kmh: f64,
}

#[derive(Debug, Deserialize)]
struct OMDailyBlock {
    time: Vec<NaiveDate>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OMDailyResponse {
    daily: Option<OMDailyBlock>,
}

#[derive(Debug, Deserialize)]
struct OMCurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    precipitation: f64,
    weather_code: i32,
    wind_speed_10m: f64,
}

#[derive(Debug, Deserialize)]
struct OMCurrentResponse {
    current: Option<OMCurrentBlock>,
}

impl WeatherClient {
    /// Create a new WeatherClient
    pub fn new(forecast_url: String, archive_url: String, timezone: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            forecast_url,
            archive_url,
            timezone,
        }
    }

    /// Historical daily temperatures between two dates (inclusive)
    pub async fn get_historical_temperatures(
        &self,
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<DailyTemperature>> {
        let response = self
            .client
            .get(&self.archive_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", start_date.to_string()),
                ("end_date", end_date.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min".to_string(),
                ),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|_| AppError::WeatherServiceUnavailable)?;

        if !response.status().is_success() {
            return Err(AppError::WeatherServiceUnavailable);
        }

        let data: OMDailyResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid archive response: {}", e)))?;

        let daily = data
            .daily
            .ok_or_else(|| AppError::ExternalService("archive data unavailable".to_string()))?;

        Ok(collect_temperatures(&daily))
    }

    /// Daily forecast for the next `days` days (Open-Meteo caps at 16)
    pub async fn get_daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> AppResult<Vec<DailyForecast>> {
        let days = days.clamp(1, 16);
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_sum,weather_code"
                        .to_string(),
                ),
                ("forecast_days", days.to_string()),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|_| AppError::WeatherServiceUnavailable)?;

        if !response.status().is_success() {
            return Err(AppError::WeatherServiceUnavailable);
        }

        let data: OMDailyResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid forecast response: {}", e)))?;

        let daily = data
            .daily
            .ok_or_else(|| AppError::ExternalService("forecast data unavailable".to_string()))?;

        let mut forecasts = Vec::with_capacity(daily.time.len());
        for (i, &date) in daily.time.iter().enumerate() {
            let (Some(tmax), Some(tmin)) = (
                daily.temperature_2m_max.get(i).copied().flatten(),
                daily.temperature_2m_min.get(i).copied().flatten(),
            ) else {
                continue;
            };
            forecasts.push(DailyForecast {
                date,
                tmax_celsius: tmax,
                tmin_celsius: tmin,
                precipitation_mm: daily
                    .precipitation_sum
                    .get(i)
                    .copied()
                    .flatten()
                    .unwrap_or(0.0),
                weather_code: daily.weather_code.get(i).copied().flatten().unwrap_or(0),
            });
        }
        Ok(forecasts)
    }

    /// Current conditions at a location
    pub async fn get_current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<CurrentConditions> {
        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                (
                    "current",
                    "temperature_2m,relative_humidity_2m,precipitation,weather_code,wind_speed_10m"
                        .to_string(),
                ),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|_| AppError::WeatherServiceUnavailable)?;

        if !response.status().is_success() {
            return Err(AppError::WeatherServiceUnavailable);
        }

        let data: OMCurrentResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid current response: {}", e)))?;

        let current = data
            .current
            .ok_or_else(|| AppError::ExternalService("current data unavailable".to_string()))?;

        Ok(CurrentConditions {
            temperature_celsius: current.temperature_2m,
            relative_humidity_percent: current.relative_humidity_2m,
            precipitation_mm: current.precipitation,
            weather_code: current.weather_code,
            wind_speed_kmh: current.wind_speed_10m,
        })
    }
}

/// Drop days with missing temperature readings
fn collect_temperatures(daily: &OMDailyBlock) -> Vec<DailyTemperature> {
    let mut days = Vec::with_capacity(daily.time.len());
    for (i, &date) in daily.time.iter().enumerate() {
        let (Some(tmax), Some(tmin)) = (
            daily.temperature_2m_max.get(i).copied().flatten(),
            daily.temperature_2m_min.get(i).copied().flatten(),
        ) else {
            continue;
        };
        days.push(DailyTemperature {
            date,
            tmax_celsius: tmax,
            tmin_celsius: tmin,
        });
    }
    days
}
