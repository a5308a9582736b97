//! EDR API Server
//!
//! OGC API - Environmental Data Retrieval and OGC API - Features over PostGIS.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use edr_api::state::AppState;

/// EDR API Server
#[derive(Parser, Debug)]
#[command(name = "edr-api")]
#[command(about = "OGC API - Environmental Data Retrieval and Features server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8083", env = "EDR_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "EDR_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Directory holding crs.yaml and collections/*.yaml
    #[arg(long, default_value = "config", env = "EDR_CONFIG_DIR")]
    config_dir: PathBuf,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!(config_dir = %args.config_dir.display(), "Starting EDR API server");

    // Initialize application state
    let state = AppState::new(&args.config_dir)
        .await
        .context("Failed to initialize application state")?
        .with_prometheus(prometheus_handle);

    info!(
        collections = state.collections.len(),
        crs = state.crs_registry.len(),
        base_url = %state.base_url,
        "Registries loaded"
    );

    let app = edr_api::router(Arc::new(state));

    let addr: SocketAddr = args.listen.parse().context("Invalid listen address")?;
    info!("EDR API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind")?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
