use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric columns of the `LLM-Metrics` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    NumRequestsRunning,
    NumRequestsWaiting,
    KvCacheUsagePerc,
    AvgQueueTimeSeconds,
    GpuUtilPercent,
    TotalGb,
    UsedGb,
    PercentMemory,
    CpuPercent,
}

impl MetricField {
    pub const ALL: [MetricField; 9] = [
        MetricField::NumRequestsRunning,
        MetricField::NumRequestsWaiting,
        MetricField::KvCacheUsagePerc,
        MetricField::AvgQueueTimeSeconds,
        MetricField::GpuUtilPercent,
        MetricField::TotalGb,
        MetricField::UsedGb,
        MetricField::PercentMemory,
        MetricField::CpuPercent,
    ];

    /// Column name in the source table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumRequestsRunning => "num_requests_running",
            Self::NumRequestsWaiting => "num_requests_waiting",
            Self::KvCacheUsagePerc => "kv_cache_usage_perc",
            Self::AvgQueueTimeSeconds => "avg_queue_time_seconds",
            Self::GpuUtilPercent => "gpu_util_percent",
            Self::TotalGb => "total_gb",
            Self::UsedGb => "used_gb",
            Self::PercentMemory => "percent_memory",
            Self::CpuPercent => "cpu_percent",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the metrics table
///
/// Serialized flat (`created_at` plus one key per series) so the JSON shape
/// matches the source row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "created_at")]
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl MetricSample {
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            occurred_at,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: MetricField, value: f64) -> Self {
        self.set_value(field, value);
        self
    }

    /// Store a reading; NaN and infinities are dropped like a NULL column
    /// since JSON cannot carry them.
    pub fn set_value(&mut self, field: MetricField, value: f64) {
        if value.is_finite() {
            self.fields.insert(field.as_str().to_string(), value);
        }
    }

    pub fn value(&self, field: MetricField) -> Option<f64> {
        self.fields.get(field.as_str()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_field_column_names_roundtrip() {
        for field in MetricField::ALL {
            assert_eq!(MetricField::from_column(field.as_str()), Some(field));
        }
        assert_eq!(MetricField::from_column("id"), None);
    }

    #[test]
    fn test_sample_serializes_flat() {
        let sample = MetricSample::new(Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap())
            .with_value(MetricField::KvCacheUsagePerc, 81.5)
            .with_value(MetricField::NumRequestsWaiting, 2.0);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["created_at"], "2025-01-10T10:00:00Z");
        assert_eq!(json["kv_cache_usage_perc"], 81.5);
        assert_eq!(json["num_requests_waiting"], 2.0);
        assert!(json.get("id").is_none());

        let back: MetricSample = serde_json::from_value(json).unwrap();
        assert_eq!(back.value(MetricField::KvCacheUsagePerc), Some(81.5));
        assert_eq!(back.value(MetricField::CpuPercent), None);
    }

    #[test]
    fn test_non_finite_values_are_skipped() {
        let sample = MetricSample::new(Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap())
            .with_value(MetricField::GpuUtilPercent, f64::NAN)
            .with_value(MetricField::CpuPercent, f64::INFINITY)
            .with_value(MetricField::KvCacheUsagePerc, 42.0);

        assert_eq!(sample.value(MetricField::GpuUtilPercent), None);
        assert_eq!(sample.value(MetricField::CpuPercent), None);

        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("null"));
        let back: MetricSample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
