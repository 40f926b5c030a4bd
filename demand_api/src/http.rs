//! HTTP routing and request handlers

use std::collections::BTreeMap;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use demand_forecast::metrics::ForecastMetrics;
use demand_forecast::models::TrainedForecastModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::service::AppState;

/// Upload cap for `/v1/update-data` payloads.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
/// Horizon applied when the query omits `days_to_forecast`.
const DEFAULT_HORIZON_DAYS: i64 = 30;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .route("/v1/inference", get(inference_handler))
        .route("/v1/update-data", post(update_data_handler))
        .route("/v1/model", get(model_info_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn healthz_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn readyz_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if state.service.snapshot().await.is_some() {
        Ok(Json(json!({ "status": "ready" })))
    } else {
        Err(ApiError::NotReady)
    }
}

#[derive(Debug, Deserialize)]
struct InferenceParams {
    days_to_forecast: Option<i64>,
}

/// Forecast the next `days_to_forecast` days, keyed by ISO date.
async fn inference_handler(
    State(state): State<AppState>,
    Query(params): Query<InferenceParams>,
) -> Result<Json<BTreeMap<String, f64>>, ApiError> {
    let days = params.days_to_forecast.unwrap_or(DEFAULT_HORIZON_DAYS);
    if days < 1 {
        return Err(ApiError::Validation(format!(
            "days_to_forecast must be a positive integer, got {days}"
        )));
    }

    let forecast = state.service.forecast(days as usize).await?;
    let body: BTreeMap<String, f64> = forecast
        .into_iter()
        .map(|(date, value)| (date.to_string(), value))
        .collect();

    Ok(Json(body))
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    message: &'static str,
}

/// Replace the dataset from an uploaded CSV file and retrain.
async fn update_data_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UpdateResponse>, ApiError> {
    let mut payload: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|err| {
        ApiError::Validation(format!("invalid multipart request: {err}"))
    })? {
        let named_file = field.name() == Some("file");
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::Validation(format!("failed to read uploaded file: {err}")))?
            .to_vec();
        if named_file {
            payload = Some(bytes);
            break;
        }
        if payload.is_none() {
            payload = Some(bytes);
        }
    }

    let payload = payload.ok_or_else(|| {
        ApiError::Validation("multipart request contains no file field".to_string())
    })?;
    info!(bytes = payload.len(), "received dataset upload");

    state.service.replace_data(payload).await?;

    Ok(Json(UpdateResponse {
        message: "Data updated and model retrained successfully",
    }))
}

#[derive(Debug, Serialize)]
struct OrderInfo {
    p: usize,
    d: usize,
    q: usize,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    model: String,
    order: OrderInfo,
    observations: usize,
    days: usize,
    train_len: usize,
    train_end: Option<NaiveDate>,
    aic: f64,
    bic: f64,
    holdout: Option<ForecastMetrics>,
    trained_at: DateTime<Utc>,
}

/// Summary of the currently published model.
async fn model_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelInfo>, ApiError> {
    let snapshot = state.service.snapshot().await.ok_or(ApiError::NotReady)?;
    let model = snapshot.model();
    let (p, d, q) = model.order();

    Ok(Json(ModelInfo {
        model: model.name().to_string(),
        order: OrderInfo { p, d, q },
        observations: snapshot.records().len(),
        days: snapshot.daily().len(),
        train_len: snapshot.train_len(),
        train_end: snapshot.train_end(),
        aic: model.aic(),
        bic: model.bic(),
        holdout: snapshot.holdout_metrics().cloned(),
        trained_at: snapshot.trained_at(),
    }))
}
