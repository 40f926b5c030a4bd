use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use demand_api::config::Args;
use demand_api::http::build_router;
use demand_api::service::{AppState, ForecastService};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!(bind = %args.bind, data = %args.training_data.display(), "starting demand-api");

    let service = Arc::new(ForecastService::new());
    match service.load_from_path(&args.training_data).await {
        Ok(()) => info!("initial dataset loaded and model fitted"),
        Err(err) => warn!(
            error = %err,
            "initial load failed; serving not-ready until a dataset is uploaded"
        ),
    }

    let app = build_router(AppState::new(service));
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received; draining connections");
}
