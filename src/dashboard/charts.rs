//! Chart models
//!
//! Every chart, metric or request based, goes through [`build_chart`]: pull
//! the series out of the snapshot, aggregate it, then correlate the plotted
//! points with the incident groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::series::{Aggregation, SeriesPoint};
use super::snapshot::DashboardSnapshot;
use crate::correlation::{Correlator, OrphanIncident};
use crate::models::{MetricField, MetricSample};

/// Where a chart takes its values from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSource {
    Metric(MetricField),
    /// Per-interval completed request counts
    CompletedRequests,
}

impl ChartSource {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Metric(field) => field.as_str(),
            Self::CompletedRequests => "completed_requests",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    pub source: ChartSource,
    pub title: String,
    /// Hex colour, `#rrggbb`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Fixed y-axis range; auto-scaled when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_domain: Option<(f64, f64)>,
    pub aggregation: Aggregation,
}

impl ChartSpec {
    fn metric(field: MetricField, title: &str, color: &str) -> Self {
        Self {
            source: ChartSource::Metric(field),
            title: title.to_string(),
            color: color.to_string(),
            unit: None,
            y_domain: None,
            aggregation: Aggregation::Raw,
        }
    }

    fn percent(mut self) -> Self {
        self.unit = Some("%".to_string());
        self.y_domain = Some((0.0, 100.0));
        self
    }

    fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    fn requests(title: &str, color: &str, aggregation: Aggregation) -> Self {
        Self {
            source: ChartSource::CompletedRequests,
            title: title.to_string(),
            color: color.to_string(),
            unit: None,
            y_domain: None,
            aggregation,
        }
    }
}

/// The dashboard's charts, in display order
pub fn default_charts() -> Vec<ChartSpec> {
    vec![
        ChartSpec::metric(MetricField::KvCacheUsagePerc, "KV Cache Usage (%)", "#ef4444").percent(),
        ChartSpec::metric(MetricField::NumRequestsRunning, "Requests Running", "#3b82f6"),
        ChartSpec::metric(MetricField::NumRequestsWaiting, "Requests Waiting", "#f59e0b"),
        ChartSpec::metric(
            MetricField::AvgQueueTimeSeconds,
            "Average Queue Time (s)",
            "#8b5cf6",
        )
        .unit("s"),
        ChartSpec::metric(MetricField::GpuUtilPercent, "GPU Utilization (%)", "#10b981").percent(),
        ChartSpec::metric(MetricField::PercentMemory, "Memory Usage (%)", "#6366f1").percent(),
        ChartSpec::metric(MetricField::CpuPercent, "CPU Utilization (%)", "#ec4899").percent(),
        ChartSpec::requests("Completed Requests per Interval", "#14b8a6", Aggregation::Raw),
        ChartSpec::requests("Completed Requests (total)", "#0ea5e9", Aggregation::Cumulative),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    /// `HH:MM:SS` label
    pub time: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub has_incident: bool,
    pub incident_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub spec: ChartSpec,
    /// Ascending by time
    pub points: Vec<ChartPoint>,
    /// Incident groups with no nearby point, drawn as vertical markers
    pub orphans: Vec<OrphanIncident>,
}

impl ChartView {
    pub fn incident_points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.points.iter().filter(|p| p.has_incident)
    }
}

fn source_points(source: ChartSource, snapshot: &DashboardSnapshot) -> Vec<SeriesPoint> {
    match source {
        ChartSource::Metric(field) => snapshot
            .metrics
            .iter()
            .filter_map(|m| m.value(field).map(|v| SeriesPoint::new(m.occurred_at, v)))
            .collect(),
        ChartSource::CompletedRequests => snapshot
            .requests_history
            .iter()
            .map(|h| SeriesPoint::new(h.timestamp, h.count as f64))
            .collect(),
    }
}

/// Build one chart from a snapshot
pub fn build_chart(
    spec: &ChartSpec,
    snapshot: &DashboardSnapshot,
    correlator: &Correlator,
) -> ChartView {
    let key = spec.source.key();
    let points = spec.aggregation.apply(&source_points(spec.source, snapshot));

    let samples: Vec<MetricSample> = points
        .iter()
        .map(|p| {
            let mut sample = MetricSample::new(p.timestamp);
            sample.fields.insert(key.to_string(), p.value);
            sample
        })
        .collect();

    let correlation = correlator.annotate(&samples, &snapshot.errors);

    let points = correlation
        .samples
        .into_iter()
        .map(|a| ChartPoint {
            time: a.sample.occurred_at.format("%H:%M:%S").to_string(),
            timestamp: a.sample.occurred_at,
            value: a.sample.fields.get(key).copied().unwrap_or_default(),
            has_incident: a.has_incident,
            incident_count: a.incident_count,
            incident_message: a.incident_sample_message,
        })
        .collect();

    ChartView {
        spec: spec.clone(),
        points,
        orphans: correlation.orphans,
    }
}
