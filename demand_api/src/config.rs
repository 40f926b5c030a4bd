//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Demand forecasting HTTP service.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Socket address the HTTP server binds to.
    #[clap(long, default_value = "0.0.0.0:8000", env = "DEMAND_API_BIND")]
    pub bind: SocketAddr,

    /// CSV dataset loaded and fitted at startup.
    #[clap(
        long = "training-data",
        default_value = "data/data_training.csv",
        env = "DEMAND_API_TRAINING_DATA"
    )]
    pub training_data: PathBuf,
}
