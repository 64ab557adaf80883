//! Incident grouping and metric correlation
//!
//! Both halves are pure functions over in-memory sequences:
//!
//! ```text
//! ErrorEvent rows ──group()──▶ IncidentGroup list ──Correlator::annotate()──▶ AnnotatedSample list
//!                                                         ▲                    + OrphanIncident list
//! MetricSample rows ──────────────────────────────────────┘
//! ```

pub mod correlator;
pub mod grouper;

pub use correlator::{AnnotatedSample, Correlation, Correlator, OrphanIncident};
pub use grouper::{group, IncidentGroup};

use chrono::{DateTime, Utc};

/// Default gap between consecutive errors that still chains them together
pub const DEFAULT_GAP_THRESHOLD_SECONDS: f64 = 5.0;

/// Default distance within which an incident marks a metric sample
pub const DEFAULT_MATCH_WINDOW_SECONDS: f64 = 60.0;

/// Default margin around the metrics range for orphan markers (5 minutes)
pub const DEFAULT_ORPHAN_TOLERANCE_SECONDS: f64 = 300.0;

/// Signed distance `to - from` in fractional seconds
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to.signed_duration_since(from);
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_seconds_between_is_signed() {
        let t = Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap();
        let later = t + Duration::milliseconds(2500);

        assert_eq!(seconds_between(t, later), 2.5);
        assert_eq!(seconds_between(later, t), -2.5);
        assert_eq!(seconds_between(t, t), 0.0);
    }
}
