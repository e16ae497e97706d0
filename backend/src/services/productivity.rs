//! Yield estimation service
//!
//! Estimates are produced from three features (season NDVI mean,
//! accumulated GDD, total precipitation). When the farm has enough
//! seasons with both recorded metrics and observed yield, an ordinary
//! least-squares linear model is fit on them; otherwise the NDVI
//! calibration table provides the estimate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::field::FieldService;
use shared::validation::validate_season_label;
use shared::Crop;

/// Minimum complete seasons needed to fit the regression
pub const MIN_TRAINING_SAMPLES: usize = 4;

/// Productivity service
#[derive(Clone)]
pub struct ProductivityService {
    db: PgPool,
    fields: FieldService,
}

/// Features of one season
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeasonFeatures {
    pub ndvi_mean: f64,
    pub gdd_total: f64,
    pub precipitation_mm: f64,
}

/// A training sample: features plus observed yield
#[derive(Debug, Clone, Copy)]
pub struct YieldSample {
    pub features: SeasonFeatures,
    pub yield_tons_per_hectare: f64,
}

/// Fitted linear model over the three features
#[derive(Debug, Clone, Serialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: [f64; 3],
    pub rmse: f64,
}

/// Yield estimate with confidence interval
#[derive(Debug, Clone, Serialize)]
pub struct YieldEstimate {
    pub yield_tons_per_hectare: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_label: Option<String>,
    pub features: SeasonFeatures,
}

/// Comparison against the historical mean
#[derive(Debug, Clone, Serialize)]
pub struct MeanComparison {
    pub estimate: f64,
    pub historical_mean: f64,
    pub difference_absolute: f64,
    pub difference_percent: f64,
    pub status: String,
    pub alerts: Vec<ProductivityAlert>,
}

/// Deviation alert
#[derive(Debug, Clone, Serialize)]
pub struct ProductivityAlert {
    pub level: String,
    pub message: String,
    pub suggested_action: String,
}

/// Trend over recent seasons
#[derive(Debug, Clone, Serialize)]
pub struct YieldTrend {
    pub direction: String,
    pub variation_percent: f64,
    pub historical_mean: f64,
    pub seasons: Vec<String>,
    pub yields: Vec<f64>,
}

/// Comparison against the previous season
#[derive(Debug, Clone, Serialize)]
pub struct PreviousSeasonComparison {
    pub previous_season: String,
    pub previous_yield: f64,
    pub difference_absolute: f64,
    pub difference_percent: f64,
}

/// Full estimate response
#[derive(Debug, Serialize)]
pub struct ProductivityReport {
    pub field_id: Uuid,
    pub season: String,
    pub crop: String,
    pub estimate: YieldEstimate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_comparison: Option<MeanComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_season: Option<PreviousSeasonComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<YieldTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_yield: Option<ObservedYield>,
}

/// Observed yield reported by the producer
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ObservedYield {
    pub yield_tons_per_hectare: f64,
    pub harvest_date: Option<NaiveDate>,
    pub moisture_percent: Option<f64>,
    pub source: String,
}

/// Input for recording season data
#[derive(Debug, Deserialize)]
pub struct RecordYieldInput {
    pub field_id: Uuid,
    pub season: String,
    pub crop: String,
    pub yield_tons_per_hectare: Option<f64>,
    pub harvest_date: Option<NaiveDate>,
    pub moisture_percent: Option<f64>,
    pub source: Option<String>,
    pub ndvi_mean: Option<f64>,
    pub gdd_total: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

/// One season of history
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SeasonHistory {
    pub season: String,
    pub crop: String,
    pub ndvi_mean: Option<f64>,
    pub gdd_total: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub yield_tons_per_hectare: Option<f64>,
}

/// Two-season comparison
#[derive(Debug, Serialize)]
pub struct SeasonComparison {
    pub field_id: Uuid,
    pub season_a: SeasonHistory,
    pub season_b: SeasonHistory,
    pub yield_difference: Option<f64>,
    pub ndvi_difference: Option<f64>,
    pub precipitation_difference: Option<f64>,
}

// ============================================================================
// Pure estimation logic
// ============================================================================

/// Fit an ordinary least-squares model via the normal equations.
/// Returns None when there are too few samples or the system is singular.
pub fn fit_linear_model(samples: &[YieldSample]) -> Option<LinearModel> {
    if samples.len() < MIN_TRAINING_SAMPLES {
        return None;
    }

    // X^T X (4x4) and X^T y (4), rows of X are [1, ndvi, gdd, precip]
    let mut xtx = [[0.0f64; 4]; 4];
    let mut xty = [0.0f64; 4];
    for sample in samples {
        let row = [
            1.0,
            sample.features.ndvi_mean,
            sample.features.gdd_total,
            sample.features.precipitation_mm,
        ];
        for i in 0..4 {
            for j in 0..4 {
                xtx[i][j] += row[i] * row[j];
            }
            xty[i] += row[i] * sample.yield_tons_per_hectare;
        }
    }

    let beta = solve_4x4(xtx, xty)?;

    let mut sq_err = 0.0;
    for sample in samples {
        let predicted = beta[0]
            + beta[1] * sample.features.ndvi_mean
            + beta[2] * sample.features.gdd_total
            + beta[3] * sample.features.precipitation_mm;
        let residual = sample.yield_tons_per_hectare - predicted;
        sq_err += residual * residual;
    }
    let rmse = (sq_err / samples.len() as f64).sqrt();

    Some(LinearModel {
        intercept: beta[0],
        coefficients: [beta[1], beta[2], beta[3]],
        rmse,
    })
}

/// Gaussian elimination with partial pivoting
fn solve_4x4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> Option<[f64; 4]> {
    for col in 0..4 {
        let mut pivot = col;
        for row in col + 1..4 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..4 {
            let factor = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; 4];
    for row in (0..4).rev() {
        let mut sum = b[row];
        for col in row + 1..4 {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

impl LinearModel {
    pub fn predict(&self, features: &SeasonFeatures) -> f64 {
        self.intercept
            + self.coefficients[0] * features.ndvi_mean
            + self.coefficients[1] * features.gdd_total
            + self.coefficients[2] * features.precipitation_mm
    }
}

/// Estimate from the regression model, clamped to plausible yields
pub fn regression_estimate(
    model: &LinearModel,
    crop: Crop,
    features: SeasonFeatures,
) -> YieldEstimate {
    let max_yield = crop.max_yield();
    let predicted = model.predict(&features).clamp(0.0, max_yield);
    let margin = 1.96 * model.rmse;
    YieldEstimate {
        yield_tons_per_hectare: round2(predicted),
        confidence_low: round2((predicted - margin).max(0.0)),
        confidence_high: round2((predicted + margin).min(max_yield)),
        method: "linear_regression".to_string(),
        band_label: None,
        features,
    }
}

/// Estimate from the NDVI calibration table
pub fn calibration_estimate(crop: Crop, features: SeasonFeatures) -> AppResult<YieldEstimate> {
    let band = crop
        .calibration_band_for(features.ndvi_mean)
        .ok_or_else(|| AppError::Validation {
            field: "ndvi_mean".to_string(),
            message: format!("NDVI {} outside the calibrated range", features.ndvi_mean),
            message_pt: format!("NDVI {} fora da faixa calibrada", features.ndvi_mean),
        })?;
    Ok(YieldEstimate {
        yield_tons_per_hectare: round2(band.midpoint()),
        confidence_low: band.yield_low,
        confidence_high: band.yield_high,
        method: "calibration_table".to_string(),
        band_label: Some(band.label.to_string()),
        features,
    })
}

/// Compare an estimate against the historical mean, raising alerts at
/// -10 % (warning), -20 % (critical) and +10 % (positive)
pub fn compare_with_mean(estimate: f64, historical_mean: f64) -> MeanComparison {
    let difference = estimate - historical_mean;
    let percent = if historical_mean.abs() < f64::EPSILON {
        0.0
    } else {
        difference / historical_mean * 100.0
    };

    let mut alerts = Vec::new();
    if percent < -20.0 {
        alerts.push(ProductivityAlert {
            level: "critical".to_string(),
            message: format!(
                "Estimate {:.1}% below the historical mean",
                percent.abs()
            ),
            suggested_action: "Check crop condition, nutrition and pests".to_string(),
        });
    } else if percent < -10.0 {
        alerts.push(ProductivityAlert {
            level: "warning".to_string(),
            message: format!(
                "Estimate {:.1}% below the historical mean",
                percent.abs()
            ),
            suggested_action: "Monitor crop development".to_string(),
        });
    } else if percent > 10.0 {
        alerts.push(ProductivityAlert {
            level: "positive".to_string(),
            message: format!("Estimate {:.1}% above the historical mean", percent),
            suggested_action: "Crop developing well".to_string(),
        });
    }

    MeanComparison {
        estimate: round2(estimate),
        historical_mean: round2(historical_mean),
        difference_absolute: round2(difference),
        difference_percent: round2(percent),
        status: if difference > 0.0 {
            "above".to_string()
        } else if difference < 0.0 {
            "below".to_string()
        } else {
            "equal".to_string()
        },
        alerts,
    }
}

/// Trend across recent seasons (newest first): ±5 % decides direction
pub fn yield_trend(seasons: &[(String, f64)]) -> Option<YieldTrend> {
    if seasons.len() < 2 {
        return None;
    }
    let yields: Vec<f64> = seasons.iter().map(|(_, y)| *y).collect();
    let mean = yields.iter().sum::<f64>() / yields.len() as f64;
    let oldest = *yields.last().unwrap();
    let newest = yields[0];
    if oldest.abs() < f64::EPSILON {
        return None;
    }
    let variation = (newest - oldest) / oldest * 100.0;

    let direction = if variation > 5.0 {
        "rising"
    } else if variation < -5.0 {
        "falling"
    } else {
        "stable"
    };

    Some(YieldTrend {
        direction: direction.to_string(),
        variation_percent: round2(variation),
        historical_mean: round2(mean),
        seasons: seasons.iter().map(|(s, _)| s.clone()).collect(),
        yields,
    })
}

/// "2024/2025" -> "2023/2024"
pub fn previous_season_label(season: &str) -> Option<String> {
    let (start, _) = validate_season_label(season).ok()?;
    Some(format!("{}/{}", start - 1, start))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Service
// ============================================================================

impl ProductivityService {
    /// Create a new ProductivityService instance
    pub fn new(db: PgPool) -> Self {
        let fields = FieldService::new(db.clone());
        Self { db, fields }
    }

    /// Estimate productivity for a field and season
    pub async fn estimate(
        &self,
        field_id: Uuid,
        season: &str,
        crop_name: &str,
        feature_override: Option<SeasonFeatures>,
    ) -> AppResult<ProductivityReport> {
        validate_season_label(season).map_err(|msg| AppError::Validation {
            field: "season".to_string(),
            message: msg.to_string(),
            message_pt: "Safra deve ter o formato AAAA/AAAA".to_string(),
        })?;
        let crop = Crop::parse(crop_name)
            .ok_or_else(|| AppError::UnsupportedCrop(crop_name.to_string()))?;

        let field = self.fields.get_field(field_id).await?;

        let features = match feature_override {
            Some(features) => features,
            None => self.season_features(field_id, season).await?,
        };

        // train on the whole farm's completed seasons for this crop
        let samples = self.training_samples(field.farm_id, crop).await?;
        let estimate = match fit_linear_model(&samples) {
            Some(model) => regression_estimate(&model, crop, features),
            None => calibration_estimate(crop, features)?,
        };

        let history = self.recent_yields(field_id, crop, 3).await?;
        let trend = yield_trend(&history);
        let mean_comparison = trend.as_ref().map(|t| {
            compare_with_mean(estimate.yield_tons_per_hectare, t.historical_mean)
        });

        let previous_season = match previous_season_label(season) {
            Some(previous) => self
                .observed_yield(field_id, &previous)
                .await?
                .map(|observed| {
                    let diff = estimate.yield_tons_per_hectare - observed.yield_tons_per_hectare;
                    let percent = if observed.yield_tons_per_hectare.abs() < f64::EPSILON {
                        0.0
                    } else {
                        diff / observed.yield_tons_per_hectare * 100.0
                    };
                    PreviousSeasonComparison {
                        previous_season: previous,
                        previous_yield: observed.yield_tons_per_hectare,
                        difference_absolute: round2(diff),
                        difference_percent: round2(percent),
                    }
                }),
            None => None,
        };

        let observed_yield = self.observed_yield(field_id, season).await?;

        Ok(ProductivityReport {
            field_id,
            season: season.to_string(),
            crop: crop.as_str().to_string(),
            estimate,
            mean_comparison,
            previous_season,
            trend,
            observed_yield,
        })
    }

    /// Record observed yield and/or season metrics
    pub async fn record_yield(&self, input: RecordYieldInput) -> AppResult<SeasonHistory> {
        validate_season_label(&input.season).map_err(|msg| AppError::Validation {
            field: "season".to_string(),
            message: msg.to_string(),
            message_pt: "Safra deve ter o formato AAAA/AAAA".to_string(),
        })?;
        let crop = Crop::parse(&input.crop)
            .ok_or_else(|| AppError::UnsupportedCrop(input.crop.clone()))?;
        if let Some(value) = input.yield_tons_per_hectare {
            if !(0.0..=crop.max_yield() * 2.0).contains(&value) {
                return Err(AppError::Validation {
                    field: "yield_tons_per_hectare".to_string(),
                    message: format!("Implausible yield for {}: {}", crop.as_str(), value),
                    message_pt: format!(
                        "Produtividade implausível para {}: {}",
                        crop.as_str(),
                        value
                    ),
                });
            }
        }
        // field must exist
        self.fields.get_field(input.field_id).await?;

        let source = input.source.unwrap_or_else(|| "producer".to_string());
        let record = sqlx::query_as::<_, SeasonHistory>(
            r#"
            INSERT INTO yield_records (
                field_id, season, crop, yield_tons_per_hectare, harvest_date,
                moisture_percent, source, ndvi_mean, gdd_total, precipitation_mm
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (field_id, season, crop) DO UPDATE SET
                yield_tons_per_hectare = COALESCE(EXCLUDED.yield_tons_per_hectare, yield_records.yield_tons_per_hectare),
                harvest_date = COALESCE(EXCLUDED.harvest_date, yield_records.harvest_date),
                moisture_percent = COALESCE(EXCLUDED.moisture_percent, yield_records.moisture_percent),
                source = EXCLUDED.source,
                ndvi_mean = COALESCE(EXCLUDED.ndvi_mean, yield_records.ndvi_mean),
                gdd_total = COALESCE(EXCLUDED.gdd_total, yield_records.gdd_total),
                precipitation_mm = COALESCE(EXCLUDED.precipitation_mm, yield_records.precipitation_mm)
            RETURNING season, crop, ndvi_mean, gdd_total, precipitation_mm, yield_tons_per_hectare
            "#,
        )
        .bind(input.field_id)
        .bind(&input.season)
        .bind(crop.as_str())
        .bind(input.yield_tons_per_hectare)
        .bind(input.harvest_date)
        .bind(input.moisture_percent)
        .bind(&source)
        .bind(input.ndvi_mean)
        .bind(input.gdd_total)
        .bind(input.precipitation_mm)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    /// Season history for a field (newest first)
    pub async fn history(
        &self,
        field_id: Uuid,
        crop_name: Option<&str>,
        seasons: i64,
    ) -> AppResult<Vec<SeasonHistory>> {
        let crop_filter = match crop_name {
            Some(name) => Some(
                Crop::parse(name)
                    .ok_or_else(|| AppError::UnsupportedCrop(name.to_string()))?,
            ),
            None => None,
        };

        let rows = match crop_filter {
            Some(crop) => {
                sqlx::query_as::<_, SeasonHistory>(
                    r#"
                    SELECT season, crop, ndvi_mean, gdd_total, precipitation_mm,
                           yield_tons_per_hectare
                    FROM yield_records
                    WHERE field_id = $1 AND crop = $2
                    ORDER BY season DESC
                    LIMIT $3
                    "#,
                )
                .bind(field_id)
                .bind(crop.as_str())
                .bind(seasons)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, SeasonHistory>(
                    r#"
                    SELECT season, crop, ndvi_mean, gdd_total, precipitation_mm,
                           yield_tons_per_hectare
                    FROM yield_records
                    WHERE field_id = $1
                    ORDER BY season DESC
                    LIMIT $2
                    "#,
                )
                .bind(field_id)
                .bind(seasons)
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(rows)
    }

    /// Compare two seasons of the same field
    pub async fn compare_seasons(
        &self,
        field_id: Uuid,
        season_a: &str,
        season_b: &str,
    ) -> AppResult<SeasonComparison> {
        let a = self.season_record(field_id, season_a).await?;
        let b = self.season_record(field_id, season_b).await?;

        let diff = |x: Option<f64>, y: Option<f64>| match (x, y) {
            (Some(x), Some(y)) => Some(round2(x - y)),
            _ => None,
        };

        Ok(SeasonComparison {
            field_id,
            yield_difference: diff(a.yield_tons_per_hectare, b.yield_tons_per_hectare),
            ndvi_difference: diff(a.ndvi_mean, b.ndvi_mean),
            precipitation_difference: diff(a.precipitation_mm, b.precipitation_mm),
            season_a: a,
            season_b: b,
        })
    }

    /// Supported crops with units and plausible maxima
    pub fn supported_crops() -> Vec<serde_json::Value> {
        Crop::ALL
            .iter()
            .map(|crop| {
                serde_json::json!({
                    "id": crop.as_str(),
                    "name": crop.display_name(),
                    "unit": "t/ha",
                    "max_yield_tons_per_hectare": crop.max_yield(),
                    "has_calibration": crop.calibration_bands().is_some(),
                })
            })
            .collect()
    }

    async fn season_features(&self, field_id: Uuid, season: &str) -> AppResult<SeasonFeatures> {
        let row = sqlx::query_as::<_, (Option<f64>, Option<f64>, Option<f64>)>(
            r#"
            SELECT ndvi_mean, gdd_total, precipitation_mm
            FROM yield_records
            WHERE field_id = $1 AND season = $2
            "#,
        )
        .bind(field_id)
        .bind(season)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some((Some(ndvi), gdd, precipitation)) => Ok(SeasonFeatures {
                ndvi_mean: ndvi,
                gdd_total: gdd.unwrap_or(0.0),
                precipitation_mm: precipitation.unwrap_or(0.0),
            }),
            _ => Err(AppError::Validation {
                field: "season".to_string(),
                message: format!(
                    "No recorded metrics for season {}; record NDVI first or pass ndvi_mean",
                    season
                ),
                message_pt: format!(
                    "Sem métricas registradas para a safra {}; registre o NDVI ou informe ndvi_mean",
                    season
                ),
            }),
        }
    }

    async fn training_samples(&self, farm_id: Uuid, crop: Crop) -> AppResult<Vec<YieldSample>> {
        let rows = sqlx::query_as::<_, (f64, Option<f64>, Option<f64>, f64)>(
            r#"
            SELECT yr.ndvi_mean, yr.gdd_total, yr.precipitation_mm, yr.yield_tons_per_hectare
            FROM yield_records yr
            JOIN fields f ON f.id = yr.field_id
            WHERE f.farm_id = $1 AND yr.crop = $2
              AND yr.ndvi_mean IS NOT NULL
              AND yr.yield_tons_per_hectare IS NOT NULL
            "#,
        )
        .bind(farm_id)
        .bind(crop.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ndvi, gdd, precipitation, observed)| YieldSample {
                features: SeasonFeatures {
                    ndvi_mean: ndvi,
                    gdd_total: gdd.unwrap_or(0.0),
                    precipitation_mm: precipitation.unwrap_or(0.0),
                },
                yield_tons_per_hectare: observed,
            })
            .collect())
    }

    async fn recent_yields(
        &self,
        field_id: Uuid,
        crop: Crop,
        limit: i64,
    ) -> AppResult<Vec<(String, f64)>> {
        let rows = sqlx::query_as::<_, (String, f64)>(
            r#"
            SELECT season, yield_tons_per_hectare
            FROM yield_records
            WHERE field_id = $1 AND crop = $2 AND yield_tons_per_hectare IS NOT NULL
            ORDER BY season DESC
            LIMIT $3
            "#,
        )
        .bind(field_id)
        .bind(crop.as_str())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn observed_yield(
        &self,
        field_id: Uuid,
        season: &str,
    ) -> AppResult<Option<ObservedYield>> {
        let row = sqlx::query_as::<_, ObservedYield>(
            r#"
            SELECT yield_tons_per_hectare, harvest_date, moisture_percent, source
            FROM yield_records
            WHERE field_id = $1 AND season = $2 AND yield_tons_per_hectare IS NOT NULL
            "#,
        )
        .bind(field_id)
        .bind(season)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn season_record(&self, field_id: Uuid, season: &str) -> AppResult<SeasonHistory> {
        validate_season_label(season).map_err(|msg| AppError::Validation {
            field: "season".to_string(),
            message: msg.to_string(),
            message_pt: "Safra deve ter o formato AAAA/AAAA".to_string(),
        })?;
        sqlx::query_as::<_, SeasonHistory>(
            r#"
            SELECT season, crop, ndvi_mean, gdd_total, precipitation_mm,
                   yield_tons_per_hectare
            FROM yield_records
            WHERE field_id = $1 AND season = $2
            "#,
        )
        .bind(field_id)
        .bind(season)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Season {}", season)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ndvi: f64, gdd: f64, precip: f64, observed: f64) -> YieldSample {
        YieldSample {
            features: SeasonFeatures {
                ndvi_mean: ndvi,
                gdd_total: gdd,
                precipitation_mm: precip,
            },
            yield_tons_per_hectare: observed,
        }
    }

    #[test]
    fn regression_recovers_exact_coefficients() {
        // y = 2 + 10*ndvi + 0.001*gdd + 0.002*precip, noiseless
        let truth = |n: f64, g: f64, p: f64| 2.0 + 10.0 * n + 0.001 * g + 0.002 * p;
        let samples: Vec<YieldSample> = [
            (0.5, 1400.0, 400.0),
            (0.6, 1500.0, 450.0),
            (0.7, 1600.0, 500.0),
            (0.8, 1450.0, 350.0),
            (0.65, 1550.0, 480.0),
        ]
        .iter()
        .map(|&(n, g, p)| sample(n, g, p, truth(n, g, p)))
        .collect();

        let model = fit_linear_model(&samples).unwrap();
        assert!((model.intercept - 2.0).abs() < 1e-6);
        assert!((model.coefficients[0] - 10.0).abs() < 1e-6);
        assert!((model.coefficients[1] - 0.001).abs() < 1e-9);
        assert!((model.coefficients[2] - 0.002).abs() < 1e-9);
        assert!(model.rmse < 1e-6);
    }

    #[test]
    fn regression_needs_minimum_samples() {
        let samples = vec![
            sample(0.5, 1400.0, 400.0, 8.0),
            sample(0.6, 1500.0, 450.0, 9.0),
            sample(0.7, 1600.0, 500.0, 10.0),
        ];
        assert!(fit_linear_model(&samples).is_none());
    }

    #[test]
    fn degenerate_samples_are_singular() {
        // identical rows make X^T X singular
        let samples = vec![sample(0.5, 1400.0, 400.0, 8.0); 5];
        assert!(fit_linear_model(&samples).is_none());
    }

    #[test]
    fn calibration_uses_band_midpoint() {
        let features = SeasonFeatures {
            ndvi_mean: 0.7,
            gdd_total: 1500.0,
            precipitation_mm: 450.0,
        };
        let estimate = calibration_estimate(Crop::Corn, features).unwrap();
        assert_eq!(estimate.method, "calibration_table");
        assert_eq!(estimate.band_label.as_deref(), Some("Good"));
        assert_eq!(estimate.yield_tons_per_hectare, 10.0);
        assert_eq!(estimate.confidence_low, 8.0);
        assert_eq!(estimate.confidence_high, 12.0);
    }

    #[test]
    fn mean_comparison_alert_levels() {
        let critical = compare_with_mean(7.0, 10.0);
        assert_eq!(critical.alerts[0].level, "critical");

        let warning = compare_with_mean(8.5, 10.0);
        assert_eq!(warning.alerts[0].level, "warning");

        let positive = compare_with_mean(11.5, 10.0);
        assert_eq!(positive.alerts[0].level, "positive");

        let quiet = compare_with_mean(10.2, 10.0);
        assert!(quiet.alerts.is_empty());
    }

    #[test]
    fn trend_direction_thresholds() {
        // newest first: 10.8 vs oldest 10.0 -> +8% rising
        let rising = yield_trend(&[
            ("2024/2025".to_string(), 10.8),
            ("2023/2024".to_string(), 10.4),
            ("2022/2023".to_string(), 10.0),
        ])
        .unwrap();
        assert_eq!(rising.direction, "rising");

        let stable = yield_trend(&[
            ("2024/2025".to_string(), 10.2),
            ("2023/2024".to_string(), 10.0),
        ])
        .unwrap();
        assert_eq!(stable.direction, "stable");

        let falling = yield_trend(&[
            ("2024/2025".to_string(), 8.0),
            ("2023/2024".to_string(), 10.0),
        ])
        .unwrap();
        assert_eq!(falling.direction, "falling");

        assert!(yield_trend(&[("2024/2025".to_string(), 10.0)]).is_none());
    }

    #[test]
    fn previous_season_label_rolls_back() {
        assert_eq!(
            previous_season_label("2024/2025").as_deref(),
            Some("2023/2024")
        );
        assert!(previous_season_label("bad").is_none());
    }

    #[test]
    fn regression_estimate_is_clamped() {
        let model = LinearModel {
            intercept: 100.0,
            coefficients: [0.0, 0.0, 0.0],
            rmse: 0.5,
        };
        let estimate = regression_estimate(
            &model,
            Crop::Corn,
            SeasonFeatures {
                ndvi_mean: 0.7,
                gdd_total: 1500.0,
                precipitation_mm: 400.0,
            },
        );
        assert_eq!(estimate.yield_tons_per_hectare, Crop::Corn.max_yield());
        assert!(estimate.confidence_high <= Crop::Corn.max_yield());
    }
}
