//! Snapshot assembly
//!
//! A failed metrics query fails the snapshot. Failed error or request queries
//! only degrade it (empty incidents, zero requests) and are logged, so the
//! charts keep rendering while the results table is unavailable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;

use super::cards::DashboardCards;
use super::charts::{build_chart, ChartSpec, ChartView};
use super::series::{request_history, RequestHistoryPoint};
use crate::config::Config;
use crate::correlation::{group, Correlator, IncidentGroup};
use crate::models::{ErrorEvent, MetricSample};
use crate::telemetry::{FetchError, TelemetrySource};

/// Everything one dashboard refresh needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Newest first
    pub metrics: Vec<MetricSample>,
    /// Incident groups, ascending
    pub errors: Vec<IncidentGroup>,
    pub total_requests: i64,
    pub requests_history: Vec<RequestHistoryPoint>,
}

/// Latest sample plus request totals (`/api/metrics?latest=true`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSnapshot {
    pub metric: Option<MetricSample>,
    pub total_requests: i64,
    pub requests_history: Vec<RequestHistoryPoint>,
}

/// Raw and grouped error summary (`/api/errors`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub total_errors: usize,
    pub grouped_errors: usize,
    /// Ten most recent errors
    pub errors: Vec<ErrorEvent>,
    /// First ten incident groups
    pub grouped: Vec<IncidentGroup>,
}

const REPORT_PREVIEW: usize = 10;

async fn timed<T, F>(dataset: &'static str, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    let start = Instant::now();
    let result = fut.await;
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => {
            tracing::debug!(dataset, elapsed_ms = elapsed.as_millis() as u64, "Telemetry fetched");
            crate::metrics::record_fetch(dataset, elapsed, "ok");
        }
        Err(e) => {
            tracing::warn!(dataset, code = e.code(), error = %e, "Telemetry fetch failed");
            crate::metrics::record_fetch(dataset, elapsed, "error");
        }
    }

    result
}

async fn load_incidents(source: &dyn TelemetrySource, cfg: &Config) -> Vec<IncidentGroup> {
    match timed("errors", source.fetch_errors(cfg.dashboard.errors_limit)).await {
        Ok(errors) => group(&errors, cfg.correlation.gap_threshold_seconds),
        Err(_) => Vec::new(),
    }
}

async fn load_requests(
    source: &dyn TelemetrySource,
    cfg: &Config,
) -> (i64, Vec<RequestHistoryPoint>) {
    let (times, total) = tokio::join!(
        timed(
            "completed_requests",
            source.fetch_completed_requests(cfg.dashboard.requests_limit)
        ),
        timed("request_count", source.count_completed_requests()),
    );

    let times: Vec<DateTime<Utc>> = times.unwrap_or_default();
    (
        total.unwrap_or(0),
        request_history(&times, cfg.dashboard.request_interval_seconds),
    )
}

impl DashboardSnapshot {
    pub async fn load(
        source: &dyn TelemetrySource,
        cfg: &Config,
        limit: i64,
    ) -> Result<Self, FetchError> {
        let (metrics, errors, (total_requests, requests_history)) = tokio::join!(
            timed("metrics", source.fetch_metrics(limit)),
            load_incidents(source, cfg),
            load_requests(source, cfg),
        );

        let snapshot = Self {
            metrics: metrics?,
            errors,
            total_requests,
            requests_history,
        };

        crate::metrics::record_snapshot(snapshot.errors.len());
        Ok(snapshot)
    }

    /// Cards for the newest sample, if any
    pub fn cards(&self) -> Option<DashboardCards> {
        self.metrics
            .first()
            .map(|latest| DashboardCards::from_latest(latest, self.total_requests))
    }

    pub fn charts(&self, specs: &[ChartSpec], correlator: &Correlator) -> Vec<ChartView> {
        specs
            .iter()
            .map(|spec| build_chart(spec, self, correlator))
            .collect()
    }
}

impl LatestSnapshot {
    pub async fn load(source: &dyn TelemetrySource, cfg: &Config) -> Result<Self, FetchError> {
        let (metric, (total_requests, requests_history)) = tokio::join!(
            timed("metrics", source.fetch_latest_metric()),
            load_requests(source, cfg),
        );

        Ok(Self {
            metric: metric?,
            total_requests,
            requests_history,
        })
    }
}

impl ErrorReport {
    pub fn from_errors(errors: Vec<ErrorEvent>, gap_threshold_seconds: f64) -> Self {
        let grouped = group(&errors, gap_threshold_seconds);

        Self {
            total_errors: errors.len(),
            grouped_errors: grouped.len(),
            errors: errors.into_iter().take(REPORT_PREVIEW).collect(),
            grouped: grouped.into_iter().take(REPORT_PREVIEW).collect(),
        }
    }

    /// Unlike the snapshot, a failed error query is reported to the caller
    pub async fn load(source: &dyn TelemetrySource, cfg: &Config) -> Result<Self, FetchError> {
        let errors = timed("errors", source.fetch_errors(cfg.dashboard.errors_limit)).await?;
        Ok(Self::from_errors(errors, cfg.correlation.gap_threshold_seconds))
    }
}
