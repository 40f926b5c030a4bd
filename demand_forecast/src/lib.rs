//! # Demand Forecast
//!
//! A Rust library for demand time series forecasting.
//!
//! ## Features
//!
//! - CSV dataset loading with flexible timestamp parsing
//! - Daily aggregation of irregular timestamped demand records
//! - ARIMA modeling with conditional-least-squares estimation
//! - Forecast accuracy metrics (MAE, MSE, RMSE, MAPE, SMAPE)
//!
//! ## Quick Start
//!
//! ```no_run
//! use demand_forecast::data::{DailySeries, DataLoader};
//! use demand_forecast::models::arima::ArimaModel;
//! use demand_forecast::models::{ForecastModel, TrainedForecastModel};
//!
//! # fn main() -> demand_forecast::error::Result<()> {
//! // Load raw demand records and aggregate them per calendar day
//! let records = DataLoader::from_csv_path("data/data_training.csv")?;
//! let daily = DailySeries::from_records(&records);
//!
//! // Fit on the chronological 80% prefix
//! let (train, _holdout) = daily.train_split(0.8);
//! let model = ArimaModel::new(5, 1, 0).train(&train)?;
//!
//! // Forecast the next 30 days
//! let forecast = model.forecast(30)?;
//! println!("{:?}", forecast.values());
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod optimize;

// Re-export commonly used types
pub use crate::data::{DailySeries, DataLoader, DemandRecords};
pub use crate::error::ForecastError;
pub use crate::metrics::{evaluate_forecast, ForecastMetrics};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
