//! Summary cards built from the latest metric sample

use serde::{Deserialize, Serialize};

use crate::models::{MetricField, MetricSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Normal,
    Warning,
    Critical,
}

impl CardStatus {
    /// KV cache: critical from 85%, warning from 80%
    pub fn for_kv_cache(percent: f64) -> Self {
        if percent >= 85.0 {
            Self::Critical
        } else if percent >= 80.0 {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Queue time: critical above 5 s, warning above 2 s
    pub fn for_queue_time(seconds: f64) -> Self {
        if seconds > 5.0 {
            Self::Critical
        } else if seconds > 2.0 {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// Any waiting request is a warning
    pub fn for_waiting(waiting: f64) -> Self {
        if waiting > 0.0 {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCard {
    pub title: String,
    /// Absent when the latest sample has no value for this series
    pub value: Option<f64>,
    pub unit: String,
    pub description: String,
    pub status: CardStatus,
}

impl MetricCard {
    fn new(title: &str, value: Option<f64>, unit: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            value,
            unit: unit.to_string(),
            description: description.to_string(),
            status: CardStatus::Normal,
        }
    }

    fn with_status(mut self, rule: fn(f64) -> CardStatus) -> Self {
        self.status = self.value.map(rule).unwrap_or(CardStatus::Normal);
        self
    }

    /// Value with two decimals and its unit, or `-`
    pub fn display_value(&self) -> String {
        match self.value {
            Some(v) => format!("{}{}", format_value(v), self.unit),
            None => "-".to_string(),
        }
    }
}

/// The two card rows: vLLM critical metrics and GPU/system health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCards {
    pub critical: Vec<MetricCard>,
    pub health: Vec<MetricCard>,
}

impl DashboardCards {
    pub fn from_latest(latest: &MetricSample, total_requests: i64) -> Self {
        let v = |field| latest.value(field);

        let critical = vec![
            MetricCard::new(
                "KV Cache Usage",
                v(MetricField::KvCacheUsagePerc),
                "%",
                "GPU KV cache utilization",
            )
            .with_status(CardStatus::for_kv_cache),
            MetricCard::new(
                "Avg Queue Time",
                v(MetricField::AvgQueueTimeSeconds),
                "s",
                "Average time requests wait in queue",
            )
            .with_status(CardStatus::for_queue_time),
            MetricCard::new(
                "Requests Waiting",
                v(MetricField::NumRequestsWaiting),
                "",
                "Requests waiting to be scheduled",
            )
            .with_status(CardStatus::for_waiting),
            MetricCard::new(
                "Requests Running",
                v(MetricField::NumRequestsRunning),
                "",
                "Requests currently being processed",
            ),
        ];

        let health = vec![
            MetricCard::new(
                "GPU Utilization",
                v(MetricField::GpuUtilPercent),
                "%",
                "GPU compute utilization",
            ),
            MetricCard::new(
                "Memory Usage",
                v(MetricField::PercentMemory),
                "%",
                "System memory in use",
            ),
            MetricCard::new(
                "CPU Utilization",
                v(MetricField::CpuPercent),
                "%",
                "CPU utilization",
            ),
            MetricCard::new(
                "Completed Requests",
                Some(total_requests as f64),
                "",
                "Requests completed without error",
            ),
        ];

        Self { critical, health }
    }
}

/// Two decimal places
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_kv_cache_thresholds() {
        assert_eq!(CardStatus::for_kv_cache(79.99), CardStatus::Normal);
        assert_eq!(CardStatus::for_kv_cache(80.0), CardStatus::Warning);
        assert_eq!(CardStatus::for_kv_cache(84.9), CardStatus::Warning);
        assert_eq!(CardStatus::for_kv_cache(85.0), CardStatus::Critical);
    }

    #[test]
    fn test_queue_time_thresholds() {
        assert_eq!(CardStatus::for_queue_time(2.0), CardStatus::Normal);
        assert_eq!(CardStatus::for_queue_time(2.01), CardStatus::Warning);
        assert_eq!(CardStatus::for_queue_time(5.0), CardStatus::Warning);
        assert_eq!(CardStatus::for_queue_time(5.5), CardStatus::Critical);
    }

    #[test]
    fn test_waiting_threshold() {
        assert_eq!(CardStatus::for_waiting(0.0), CardStatus::Normal);
        assert_eq!(CardStatus::for_waiting(1.0), CardStatus::Warning);
    }

    #[test]
    fn test_cards_from_latest() {
        let latest = MetricSample::new(Utc::now())
            .with_value(MetricField::KvCacheUsagePerc, 86.123)
            .with_value(MetricField::NumRequestsWaiting, 0.0);

        let cards = DashboardCards::from_latest(&latest, 42);

        assert_eq!(cards.critical[0].status, CardStatus::Critical);
        assert_eq!(cards.critical[0].display_value(), "86.12%");
        // Missing value: no status, dash placeholder
        assert_eq!(cards.critical[1].status, CardStatus::Normal);
        assert_eq!(cards.critical[1].display_value(), "-");
        assert_eq!(cards.critical[2].status, CardStatus::Normal);
        assert_eq!(cards.health[3].display_value(), "42.00");
    }
}
