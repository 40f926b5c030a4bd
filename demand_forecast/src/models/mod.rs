//! Forecasting models for daily demand series

use crate::data::DailySeries;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::fmt::Debug;

/// Forecast result containing predicted values
#[derive(Debug, Clone)]
pub struct ForecastResult {
    /// Forecasted values, one per horizon step
    values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Calendar dates (optional)
    dates: Option<Vec<NaiveDate>>,
    /// Confidence intervals (optional)
    intervals: Option<Vec<(f64, f64)>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            dates: None,
            intervals: None,
        })
    }

    /// Attach one calendar date per forecasted value
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Result<Self> {
        if dates.len() != self.horizons {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match horizons ({})",
                dates.len(),
                self.horizons
            )));
        }

        self.dates = Some(dates);
        Ok(self)
    }

    /// Attach one confidence interval per forecasted value
    pub fn with_intervals(mut self, intervals: Vec<(f64, f64)>) -> Result<Self> {
        if intervals.len() != self.horizons {
            return Err(ForecastError::ValidationError(format!(
                "Intervals length ({}) doesn't match horizons ({})",
                intervals.len(),
                self.horizons
            )));
        }

        self.intervals = Some(intervals);
        Ok(self)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the calendar dates, if available
    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    /// Get the confidence intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a daily demand series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a daily series
    fn train(&self, data: &DailySeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod arima;
