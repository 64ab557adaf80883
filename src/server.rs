use anyhow::Result;
use arc_swap::ArcSwap;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::Config,
    handlers::{self, DashboardState},
    metrics,
    signals::setup_signal_handlers,
    telemetry::{self, FetchError, TelemetrySource},
};

/// Start the dashboard server
///
/// This function:
/// 1. Initializes metrics
/// 2. Connects the telemetry source
/// 3. Sets up signal handlers for graceful shutdown and config reload
/// 4. Binds to the configured address
/// 5. Serves requests with graceful shutdown support
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let source = connect_source(&config).await?;

    // Wrap config in ArcSwap for atomic reload support
    let config_swap = Arc::new(ArcSwap::from_pointee(config.clone()));

    let (shutdown_tx, signal_handle) = setup_signal_handlers(config_swap.clone(), config_path)?;
    let mut shutdown_rx = shutdown_tx.subscribe();

    let state = DashboardState::new(config_swap, source);
    let app = create_router(state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting GPU metrics dashboard on {}", addr);
    info!(
        "Correlation: gap {}s, match window {}s, orphan tolerance {}s",
        config.correlation.gap_threshold_seconds,
        config.correlation.match_window_seconds,
        config.correlation.orphan_tolerance_seconds
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// A missing URL is not fatal: the API reports it per request and
/// `/api/debug` shows it. A malformed URL is.
async fn connect_source(config: &Config) -> Result<Option<Arc<dyn TelemetrySource>>> {
    match telemetry::connect(&config.database).await {
        Ok(source) => Ok(Some(source)),
        Err(FetchError::NotConfigured) => {
            warn!("No database URL configured; API requests will fail until one is set");
            Ok(None)
        }
        Err(e) => Err(anyhow::anyhow!("Failed to connect telemetry source: {}", e)),
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: DashboardState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    let health_routes = Router::new()
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(health_routes)
        .nest("/api", handlers::create_dashboard_router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
