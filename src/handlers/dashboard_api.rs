//! Dashboard HTTP API handlers
//!
//! JSON endpoints consumed by the browser dashboard and `gpu-dashboard watch`:
//! - `/metrics`: snapshot of recent samples, incident groups and request history
//! - `/errors`: raw and grouped error summary
//! - `/charts`: chart and card models with incidents already correlated
//! - `/debug`: connection diagnostics

use arc_swap::ArcSwap;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::config::Config;
use crate::dashboard::{
    default_charts, ChartView, DashboardCards, DashboardSnapshot, ErrorReport, LatestSnapshot,
};
use crate::error::AppError;
use crate::telemetry::{url_preview, FetchError, TelemetrySource};

/// Upper bound for `?limit=`
pub const MAX_LIMIT: i64 = 10_000;

/// State shared across all dashboard API handlers
#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<ArcSwap<Config>>,
    /// `None` when no database URL is configured
    pub source: Option<Arc<dyn TelemetrySource>>,
}

impl DashboardState {
    pub fn new(config: Arc<ArcSwap<Config>>, source: Option<Arc<dyn TelemetrySource>>) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> Result<&dyn TelemetrySource, FetchError> {
        self.source.as_deref().ok_or(FetchError::NotConfigured)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub limit: Option<i64>,
    #[serde(default)]
    pub latest: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartsQuery {
    pub limit: Option<i64>,
}

fn resolve_limit(requested: Option<i64>, default: i64) -> Result<i64, AppError> {
    match requested {
        None => Ok(default),
        Some(n) if (1..=MAX_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, n
        ))),
    }
}

/// GET /api/metrics
///
/// Query parameters:
/// - limit: number of samples (default: `dashboard.metrics_limit`)
/// - latest: only the newest sample plus request totals
pub async fn get_metrics(
    State(state): State<DashboardState>,
    Query(params): Query<MetricsQuery>,
) -> Result<Response, AppError> {
    let config = state.config.load_full();
    let source = state
        .source()
        .map_err(|e| AppError::fetch("metrics", e))?;

    if params.latest {
        let latest = LatestSnapshot::load(source, &config)
            .await
            .map_err(|e| AppError::fetch("metrics", e))?;
        return Ok(Json(latest).into_response());
    }

    let limit = resolve_limit(params.limit, config.dashboard.metrics_limit)?;
    let snapshot = DashboardSnapshot::load(source, &config, limit)
        .await
        .map_err(|e| AppError::fetch("metrics", e))?;

    tracing::debug!(
        samples = snapshot.metrics.len(),
        incidents = snapshot.errors.len(),
        "Serving metrics snapshot"
    );

    Ok(Json(snapshot).into_response())
}

/// GET /api/errors
pub async fn get_errors(State(state): State<DashboardState>) -> Result<Json<ErrorReport>, AppError> {
    let config = state.config.load_full();
    let source = state.source().map_err(|e| AppError::fetch("errors", e))?;

    let report = ErrorReport::load(source, &config)
        .await
        .map_err(|e| AppError::fetch("errors", e))?;

    Ok(Json(report))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartsResponse {
    pub cards: Option<DashboardCards>,
    pub charts: Vec<ChartView>,
    pub generated_at: DateTime<Utc>,
}

/// GET /api/charts
///
/// Same data as `/api/metrics`, already shaped into cards and correlated
/// chart series.
pub async fn get_charts(
    State(state): State<DashboardState>,
    Query(params): Query<ChartsQuery>,
) -> Result<Json<ChartsResponse>, AppError> {
    let config = state.config.load_full();
    let source = state.source().map_err(|e| AppError::fetch("metrics", e))?;
    let limit = resolve_limit(params.limit, config.dashboard.metrics_limit)?;

    let snapshot = DashboardSnapshot::load(source, &config, limit)
        .await
        .map_err(|e| AppError::fetch("metrics", e))?;

    let correlator = config.correlation.correlator();

    Ok(Json(ChartsResponse {
        cards: snapshot.cards(),
        charts: snapshot.charts(&default_charts(), &correlator),
        generated_at: Utc::now(),
    }))
}

/// GET /api/debug
///
/// Connection diagnostics. Always 200; failures are reported in the body.
pub async fn get_debug(State(state): State<DashboardState>) -> Json<serde_json::Value> {
    let config = state.config.load_full();
    let url = config.database.resolved_url();

    let connection_test = match state.source() {
        Ok(source) => match source.ping().await {
            Ok(current_time) => json!({
                "success": true,
                "backend": source.backend(),
                "currentTime": current_time,
            }),
            Err(e) => json!({
                "success": false,
                "backend": source.backend(),
                "error": e.to_string(),
                "code": e.code(),
            }),
        },
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "code": e.code(),
        }),
    };

    Json(json!({
        "environment": {
            "hasDatabaseUrl": url.is_some(),
            "databaseUrlLength": url.as_ref().map(|u| u.len()).unwrap_or(0),
            "databaseUrlPreview": url.as_deref().map(url_preview),
        },
        "connectionTest": connection_test,
        "timestamp": Utc::now(),
    }))
}

/// Routes mounted under `/api`
pub fn create_dashboard_router(state: DashboardState) -> Router {
    Router::new()
        .route("/metrics", axum::routing::get(get_metrics))
        .route("/errors", axum::routing::get(get_errors))
        .route("/charts", axum::routing::get(get_charts))
        .route("/debug", axum::routing::get(get_debug))
        .with_state(state)
}
