//! Series aggregation strategies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// How a chart turns its input points into plotted points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregation {
    /// Values as they are
    Raw,
    /// Running total
    Cumulative,
    /// Values summed into UTC-aligned buckets; empty buckets are omitted
    PerInterval { interval_seconds: u64 },
}

impl Aggregation {
    /// Aggregate `points` (any order); output is ascending by time
    pub fn apply(&self, points: &[SeriesPoint]) -> Vec<SeriesPoint> {
        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.timestamp);

        match *self {
            Self::Raw => sorted,
            Self::Cumulative => {
                let mut total = 0.0;
                sorted
                    .into_iter()
                    .map(|p| {
                        total += p.value;
                        SeriesPoint::new(p.timestamp, total)
                    })
                    .collect()
            }
            Self::PerInterval { interval_seconds } => {
                let width = interval_seconds.max(1) as i64;
                let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
                for p in &sorted {
                    let start = p.timestamp.timestamp().div_euclid(width) * width;
                    *buckets.entry(start).or_insert(0.0) += p.value;
                }

                buckets
                    .into_iter()
                    .filter_map(|(start, value)| {
                        DateTime::from_timestamp(start, 0).map(|t| SeriesPoint::new(t, value))
                    })
                    .collect()
            }
        }
    }
}

/// Completed requests in one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHistoryPoint {
    /// `HH:MM` label of the bucket start
    pub time: String,
    pub timestamp: DateTime<Utc>,
    pub count: u64,
}

/// Count completion times per interval, ascending
pub fn request_history(times: &[DateTime<Utc>], interval_seconds: u64) -> Vec<RequestHistoryPoint> {
    let points: Vec<SeriesPoint> = times.iter().map(|&t| SeriesPoint::new(t, 1.0)).collect();

    Aggregation::PerInterval { interval_seconds }
        .apply(&points)
        .into_iter()
        .map(|p| RequestHistoryPoint {
            time: p.timestamp.format("%H:%M").to_string(),
            timestamp: p.timestamp,
            count: p.value as u64,
        })
        .collect()
}
