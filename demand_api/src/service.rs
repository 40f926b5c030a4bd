//! Snapshot state management for the forecasting service

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use demand_forecast::data::{DailySeries, DataLoader, DemandRecords};
use demand_forecast::metrics::{evaluate_forecast, ForecastMetrics};
use demand_forecast::models::arima::{ArimaModel, TrainedArimaModel};
use demand_forecast::models::{ForecastModel, TrainedForecastModel};
use tokio::sync::RwLock;
use tokio::task;
use tracing::{info, warn};

use crate::error::ApiError;

/// Model order fitted on every load: five autoregressive lags over a
/// once-differenced daily series.
pub const ARIMA_ORDER: (usize, usize, usize) = (5, 1, 0);
/// Chronological fraction of the daily series used for fitting.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Immutable bundle of dataset, derived series, and fitted model.
///
/// Built fully off to the side; readers only ever observe a published
/// snapshot, never a partially constructed one.
#[derive(Debug)]
pub struct Snapshot {
    records: DemandRecords,
    daily: DailySeries,
    train_len: usize,
    model: TrainedArimaModel,
    holdout_metrics: Option<ForecastMetrics>,
    trained_at: DateTime<Utc>,
}

impl Snapshot {
    /// Run the aggregate → split → fit pipeline on raw records.
    pub fn build(records: DemandRecords) -> Result<Self, ApiError> {
        let daily = DailySeries::from_records(&records);
        let (train, holdout) = daily.train_split(TRAIN_FRACTION);
        let (p, d, q) = ARIMA_ORDER;
        let model = ArimaModel::new(p, d, q).train(&train)?;

        let holdout_metrics = if holdout.is_empty() {
            None
        } else {
            match model.forecast(holdout.len()) {
                Ok(forecast) => evaluate_forecast(forecast.values(), holdout.totals()).ok(),
                Err(err) => {
                    warn!(error = %err, "holdout evaluation failed");
                    None
                }
            }
        };

        Ok(Self {
            records,
            daily,
            train_len: train.len(),
            model,
            holdout_metrics,
            trained_at: Utc::now(),
        })
    }

    /// The raw records backing this snapshot
    pub fn records(&self) -> &DemandRecords {
        &self.records
    }

    /// The aggregated daily series
    pub fn daily(&self) -> &DailySeries {
        &self.daily
    }

    /// Number of days in the training prefix
    pub fn train_len(&self) -> usize {
        self.train_len
    }

    /// The fitted model
    pub fn model(&self) -> &TrainedArimaModel {
        &self.model
    }

    /// Accuracy of the fitted model against the holdout suffix, when computable
    pub fn holdout_metrics(&self) -> Option<&ForecastMetrics> {
        self.holdout_metrics.as_ref()
    }

    /// When this snapshot was fitted
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Final date of the training prefix
    pub fn train_end(&self) -> Option<NaiveDate> {
        self.model.last_date()
    }
}

/// Holder of the one published snapshot.
///
/// Readers clone the `Arc` under a shared lock; writers build the replacement
/// on the blocking pool and take the exclusive lock only for the swap, so a
/// refit never blocks queries against the previous snapshot.
#[derive(Debug, Default)]
pub struct ForecastService {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ForecastService {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Load a CSV dataset from disk, fit, and publish.
    pub async fn load_from_path(&self, path: &Path) -> Result<(), ApiError> {
        let path = path.to_owned();
        let snapshot = task::spawn_blocking(move || {
            let records = DataLoader::from_csv_path(&path)?;
            Snapshot::build(records)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("snapshot build task failed: {err}")))??;

        self.publish(snapshot).await;
        Ok(())
    }

    /// Replace the dataset with uploaded CSV bytes, refit, and publish.
    ///
    /// On any failure the previously published snapshot remains in service.
    pub async fn replace_data(&self, bytes: Vec<u8>) -> Result<(), ApiError> {
        let snapshot = task::spawn_blocking(move || {
            let records = DataLoader::from_csv_bytes(bytes)?;
            Snapshot::build(records)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("snapshot build task failed: {err}")))??;

        self.publish(snapshot).await;
        Ok(())
    }

    async fn publish(&self, snapshot: Snapshot) {
        info!(
            records = snapshot.records().len(),
            days = snapshot.daily().len(),
            train_len = snapshot.train_len(),
            aic = snapshot.model().aic(),
            "publishing fitted model"
        );
        if let Some(metrics) = snapshot.holdout_metrics() {
            info!(mae = metrics.mae, rmse = metrics.rmse, "holdout accuracy");
        }

        let mut guard = self.current.write().await;
        *guard = Some(Arc::new(snapshot));
    }

    /// The currently published snapshot, if any load has succeeded.
    pub async fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Point forecasts for `days` calendar days past the training prefix.
    pub async fn forecast(&self, days: usize) -> Result<Vec<(NaiveDate, f64)>, ApiError> {
        let snapshot = self.snapshot().await.ok_or(ApiError::NotReady)?;
        let result = snapshot.model().forecast(days)?;
        let dates = result.dates().ok_or_else(|| {
            ApiError::Internal("fitted model carries no calendar dates".to_string())
        })?;

        Ok(dates
            .iter()
            .copied()
            .zip(result.values().iter().copied())
            .collect())
    }
}

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<ForecastService>,
}

impl AppState {
    pub fn new(service: Arc<ForecastService>) -> Self {
        Self { service }
    }
}
