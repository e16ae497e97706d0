//! Client for the Earth Engine vegetation-index microservice
//!
//! The microservice wraps Google Earth Engine and serves Sentinel-2 tile
//! URLs plus zonal statistics for a field geometry. It is an external
//! collaborator: this client only shapes requests and parses responses.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use shared::geometry::Geometry;

/// Earth Engine microservice client
#[derive(Clone)]
pub struct GeeClient {
    client: Client,
    base_url: String,
}

/// Statistics of an index over a field geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Computed index result: tile URL for map display plus statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResult {
    pub index: String,
    pub tile_url: String,
    pub statistics: IndexStatistics,
    pub scale_meters: u32,
}

/// A Sentinel-2 scene available for a geometry and period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneInfo {
    pub image_id: String,
    pub date: NaiveDate,
    pub cloud_cover: f64,
    pub tile_url: String,
}

#[derive(Debug, Serialize)]
struct ComputeIndexRequest<'a> {
    geometry: &'a Geometry,
    index: &'a str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    max_cloud_coverage: u8,
}

#[derive(Debug, Deserialize)]
struct ComputeIndexResponse {
    success: bool,
    error: Option<String>,
    index: Option<String>,
    tile_url: Option<String>,
    statistics: Option<IndexStatistics>,
    scale: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ListImagesRequest<'a> {
    geometry: &'a Geometry,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct ListImagesResponse {
    success: bool,
    error: Option<String>,
    #[serde(default)]
    images: Vec<SceneInfo>,
}

impl GeeClient {
    /// Create a new client for the given service URL
    pub fn new(base_url: String, timeout_seconds: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }

    /// Compute an index over a geometry for a date window
    pub async fn compute_index(
        &self,
        geometry: &Geometry,
        index: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        max_cloud_coverage: u8,
    ) -> AppResult<IndexResult> {
        let url = format!("{}/compute-index", self.base_url);
        let request = ComputeIndexRequest {
            geometry,
            index,
            start_date,
            end_date,
            max_cloud_coverage,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|_| AppError::GeeServiceUnavailable)?;

        if !response.status().is_success() {
            return Err(AppError::GeeServiceUnavailable);
        }

        let data: ComputeIndexResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid index response: {}", e)))?;

        if !data.success {
            return Err(AppError::ExternalService(
                data.error
                    .unwrap_or_else(|| "index computation failed".to_string()),
            ));
        }

        Ok(IndexResult {
            index: data.index.unwrap_or_else(|| index.to_string()),
            tile_url: data
                .tile_url
                .ok_or_else(|| AppError::ExternalService("missing tile URL".to_string()))?,
            statistics: data.statistics.unwrap_or(IndexStatistics {
                mean: None,
                min: None,
                max: None,
                std_dev: None,
            }),
            scale_meters: data.scale.unwrap_or(10),
        })
    }

    /// List recent scenes covering a geometry
    pub async fn list_images(
        &self,
        geometry: &Geometry,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Vec<SceneInfo>> {
        let url = format!("{}/list-images", self.base_url);
        let request = ListImagesRequest {
            geometry,
            start_date,
            end_date,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|_| AppError::GeeServiceUnavailable)?;

        if !response.status().is_success() {
            return Err(AppError::GeeServiceUnavailable);
        }

        let data: ListImagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("invalid image list: {}", e)))?;

        if !data.success {
            return Err(AppError::ExternalService(
                data.error.unwrap_or_else(|| "image listing failed".to_string()),
            ));
        }

        Ok(data.images)
    }
}
