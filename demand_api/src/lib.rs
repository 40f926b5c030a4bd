//! HTTP service exposing demand forecasts over a retrainable ARIMA model.
//!
//! The service holds one immutable snapshot (dataset, daily series, fitted
//! model) at a time. Forecast queries read the published snapshot; dataset
//! updates build a complete replacement off to the side and swap it in only
//! after every pipeline stage has succeeded.

pub mod config;
pub mod error;
pub mod http;
pub mod service;

pub use crate::config::Args;
pub use crate::error::ApiError;
pub use crate::http::build_router;
pub use crate::service::{AppState, ForecastService, Snapshot};

pub const CRATE_NAME: &str = "demand_api";
