//! Accuracy metrics for evaluating forecasts against observed demand

use crate::error::{ForecastError, Result};
use serde::Serialize;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Serialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn evaluate_forecast(forecast: &[f64], actual: &[f64]) -> Result<ForecastMetrics> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = forecast.len() as f64;
    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let mape = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
        .sum::<f64>()
        / n;

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denominator = a.abs() + f.abs();
            if denominator == 0.0 {
                0.0
            } else {
                200.0 * (a - f).abs() / denominator
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastMetrics {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MAE={:.4} RMSE={:.4} MAPE={:.4}% SMAPE={:.4}%",
            self.mae, self.rmse, self.mape, self.smape
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn exact_forecast_has_zero_error() {
        let metrics = evaluate_forecast(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_approx_eq!(metrics.mae, 0.0, 1e-12);
        assert_approx_eq!(metrics.rmse, 0.0, 1e-12);
        assert_approx_eq!(metrics.smape, 0.0, 1e-12);
    }

    #[test]
    fn constant_offset_metrics() {
        let metrics = evaluate_forecast(&[9.0, 19.0, 29.0], &[10.0, 20.0, 30.0]).unwrap();
        assert_approx_eq!(metrics.mae, 1.0, 1e-12);
        assert_approx_eq!(metrics.mse, 1.0, 1e-12);
        assert_approx_eq!(metrics.rmse, 1.0, 1e-12);
    }

    #[test]
    fn zero_actuals_are_skipped_in_mape() {
        let metrics = evaluate_forecast(&[1.0, 1.0], &[0.0, 2.0]).unwrap();
        assert!(metrics.mape.is_finite());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(evaluate_forecast(&[1.0], &[1.0, 2.0]).is_err());
        assert!(evaluate_forecast(&[], &[]).is_err());
    }
}
