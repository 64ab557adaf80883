use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder for the dashboard's own metrics
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    init_metric_descriptions();

    Ok(handle)
}

/// Initialize metric descriptions (can be called multiple times safely)
fn init_metric_descriptions() {
    describe_counter!(
        "dashboard_fetches_total",
        "Telemetry queries issued, by dataset and outcome"
    );
    describe_histogram!(
        "dashboard_fetch_duration_seconds",
        "Telemetry query duration in seconds"
    );
    describe_counter!(
        "dashboard_snapshots_total",
        "Dashboard snapshots assembled"
    );
    describe_gauge!(
        "dashboard_incident_groups",
        "Incident groups in the most recent snapshot"
    );
    describe_gauge!(
        "dashboard_info",
        "Dashboard version information"
    );

    gauge!("dashboard_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record one telemetry query
pub fn record_fetch(dataset: &str, duration: Duration, outcome: &str) {
    counter!(
        "dashboard_fetches_total",
        "dataset" => dataset.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);

    histogram!(
        "dashboard_fetch_duration_seconds",
        "dataset" => dataset.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record an assembled snapshot and its incident group count
pub fn record_snapshot(incident_groups: usize) {
    counter!("dashboard_snapshots_total").increment(1);
    gauge!("dashboard_incident_groups").set(incident_groups as f64);
}
