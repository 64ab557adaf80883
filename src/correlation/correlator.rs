//! Temporal correlator
//!
//! Marks each metric sample with the nearest incident group when that group
//! lies within the match window (in either direction), and collects the
//! groups that fall inside the displayed range but matched no sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    seconds_between, IncidentGroup, DEFAULT_MATCH_WINDOW_SECONDS,
    DEFAULT_ORPHAN_TOLERANCE_SECONDS,
};
use crate::models::MetricSample;

/// A metric sample with its incident overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedSample {
    #[serde(flatten)]
    pub sample: MetricSample,
    pub has_incident: bool,
    pub incident_count: usize,
    pub incident_sample_message: Option<String>,
    pub incident_time: Option<DateTime<Utc>>,
}

/// An incident inside the displayed range that no sample picked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrphanIncident {
    pub group: IncidentGroup,
}

/// Output of one correlation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Ascending by sample time
    pub samples: Vec<AnnotatedSample>,
    /// Ascending by representative time
    pub orphans: Vec<OrphanIncident>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlator {
    pub match_window_seconds: f64,
    pub orphan_tolerance_seconds: f64,
}

impl Default for Correlator {
    fn default() -> Self {
        Self {
            match_window_seconds: DEFAULT_MATCH_WINDOW_SECONDS,
            orphan_tolerance_seconds: DEFAULT_ORPHAN_TOLERANCE_SECONDS,
        }
    }
}

impl Correlator {
    pub fn new(match_window_seconds: f64) -> Self {
        Self {
            match_window_seconds,
            ..Self::default()
        }
    }

    pub fn with_orphan_tolerance(mut self, orphan_tolerance_seconds: f64) -> Self {
        self.orphan_tolerance_seconds = orphan_tolerance_seconds;
        self
    }

    /// Correlate samples (any order) against incident groups (any order)
    ///
    /// With no samples there is no displayed range, so no group is reported
    /// as an orphan.
    pub fn annotate(&self, samples: &[MetricSample], groups: &[IncidentGroup]) -> Correlation {
        if samples.is_empty() {
            return Correlation::default();
        }

        // Stable ascending order; equal times keep input order
        let mut ordered_groups: Vec<&IncidentGroup> = groups.iter().collect();
        ordered_groups.sort_by_key(|g| g.representative_time);
        let times: Vec<DateTime<Utc>> =
            ordered_groups.iter().map(|g| g.representative_time).collect();

        let mut ordered_samples: Vec<&MetricSample> = samples.iter().collect();
        ordered_samples.sort_by_key(|s| s.occurred_at);

        let mut matched = vec![false; ordered_groups.len()];

        let annotated = ordered_samples
            .iter()
            .map(|sample| {
                let nearest = nearest_group(&times, sample.occurred_at)
                    .filter(|&(_, distance)| distance <= self.match_window_seconds);

                match nearest {
                    Some((index, _)) => {
                        matched[index] = true;
                        let group = ordered_groups[index];
                        AnnotatedSample {
                            sample: (*sample).clone(),
                            has_incident: true,
                            incident_count: group.count,
                            incident_sample_message: group.first_message().map(str::to_string),
                            incident_time: Some(group.representative_time),
                        }
                    }
                    None => AnnotatedSample {
                        sample: (*sample).clone(),
                        has_incident: false,
                        incident_count: 0,
                        incident_sample_message: None,
                        incident_time: None,
                    },
                }
            })
            .collect();

        // Non-empty: checked above
        let min_time = ordered_samples[0].occurred_at;
        let max_time = ordered_samples[ordered_samples.len() - 1].occurred_at;

        let orphans = ordered_groups
            .iter()
            .zip(&matched)
            .filter(|(_, &was_matched)| !was_matched)
            .filter(|(group, _)| {
                let t = group.representative_time;
                seconds_between(t, min_time) <= self.orphan_tolerance_seconds
                    && seconds_between(max_time, t) <= self.orphan_tolerance_seconds
            })
            .map(|(group, _)| OrphanIncident {
                group: (*group).clone(),
            })
            .collect();

        Correlation {
            samples: annotated,
            orphans,
        }
    }
}

/// Index and absolute distance of the group nearest to `at`
///
/// `times` must be ascending. Equidistant candidates resolve to the earlier
/// index.
fn nearest_group(times: &[DateTime<Utc>], at: DateTime<Utc>) -> Option<(usize, f64)> {
    let right = times.partition_point(|&t| t < at);

    let left = right.checked_sub(1).map(|i| {
        // First of any run of equal times
        let t = times[i];
        times.partition_point(|&x| x < t)
    });

    let candidate = |i: usize| (i, seconds_between(times[i], at).abs());

    match (left.map(candidate), (right < times.len()).then(|| candidate(right))) {
        (Some(l), Some(r)) => Some(if l.1 <= r.1 { l } else { r }),
        (l, r) => l.or(r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::group;
    use crate::models::{ErrorEvent, MetricField};
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, h, m, s).unwrap()
    }

    fn sample(time: DateTime<Utc>) -> MetricSample {
        MetricSample::new(time).with_value(MetricField::KvCacheUsagePerc, 50.0)
    }

    fn incident(id: i64, time: DateTime<Utc>) -> IncidentGroup {
        group(&[ErrorEvent::new(id, time, Some(format!("boom {}", id)))], 5.0)
            .pop()
            .unwrap()
    }

    #[test]
    fn test_worked_example_both_samples_marked() {
        let samples = vec![sample(at(10, 0, 0)), sample(at(10, 1, 0))];
        let groups = vec![incident(1, at(10, 0, 50))];

        let result = Correlator::new(60.0).annotate(&samples, &groups);

        assert_eq!(result.samples.len(), 2);
        assert!(result.samples.iter().all(|s| s.has_incident));
        assert!(result.samples.iter().all(|s| s.incident_count == 1));
        assert_eq!(
            result.samples[0].incident_sample_message.as_deref(),
            Some("boom 1")
        );
        assert!(result.orphans.is_empty());
    }

    #[test]
    fn test_empty_samples_yield_no_orphans() {
        let groups = vec![incident(1, at(10, 0, 0))];
        let result = Correlator::default().annotate(&[], &groups);
        assert_eq!(result, Correlation::default());
    }

    #[test]
    fn test_no_groups() {
        let samples = vec![sample(at(10, 0, 0))];
        let result = Correlator::default().annotate(&samples, &[]);

        assert_eq!(result.samples.len(), 1);
        assert!(!result.samples[0].has_incident);
        assert_eq!(result.samples[0].incident_count, 0);
        assert!(result.orphans.is_empty());
    }

    #[test]
    fn test_window_is_symmetric() {
        let correlator = Correlator::new(10.0);
        let before = vec![incident(1, at(10, 0, 0) - Duration::seconds(10))];
        let after = vec![incident(1, at(10, 0, 0) + Duration::seconds(10))];
        let too_far = vec![incident(1, at(10, 0, 0) + Duration::seconds(11))];
        let samples = vec![sample(at(10, 0, 0))];

        assert!(correlator.annotate(&samples, &before).samples[0].has_incident);
        assert!(correlator.annotate(&samples, &after).samples[0].has_incident);
        assert!(!correlator.annotate(&samples, &too_far).samples[0].has_incident);
    }

    #[test]
    fn test_tie_prefers_earlier_group_regardless_of_input_order() {
        let samples = vec![sample(at(10, 0, 10))];
        let early = incident(1, at(10, 0, 5));
        let late = incident(2, at(10, 0, 15));

        let correlator = Correlator::new(30.0);
        for groups in [vec![early.clone(), late.clone()], vec![late.clone(), early.clone()]] {
            let result = correlator.annotate(&samples, &groups);
            assert_eq!(result.samples[0].incident_time, Some(at(10, 0, 5)));
            // The later group is inside the range and unmatched
            assert_eq!(result.orphans.len(), 1);
            assert_eq!(result.orphans[0].group.representative_time, at(10, 0, 15));
        }
    }

    #[test]
    fn test_nearest_group_wins() {
        let samples = vec![sample(at(10, 0, 0))];
        let groups = vec![incident(1, at(9, 59, 30)), incident(2, at(10, 0, 20))];

        let result = Correlator::new(60.0).annotate(&samples, &groups);
        assert_eq!(result.samples[0].incident_time, Some(at(10, 0, 20)));
    }

    #[test]
    fn test_one_group_may_mark_many_samples() {
        let samples: Vec<MetricSample> =
            (0..5).map(|i| sample(at(10, 0, 0) + Duration::seconds(2 * i))).collect();
        let groups = vec![incident(1, at(10, 0, 4))];

        let result = Correlator::new(60.0).annotate(&samples, &groups);
        assert!(result.samples.iter().all(|s| s.has_incident));
    }

    #[test]
    fn test_orphan_range_uses_tolerance() {
        let samples = vec![sample(at(10, 0, 0)), sample(at(10, 10, 0))];
        let groups = vec![
            incident(1, at(9, 55, 0)),  // 5 min before range, unmatched
            incident(2, at(10, 5, 0)),  // mid range, unmatched
            incident(3, at(9, 54, 59)), // outside tolerance
            incident(4, at(10, 20, 0)), // outside tolerance
        ];

        let result = Correlator::new(30.0)
            .with_orphan_tolerance(300.0)
            .annotate(&samples, &groups);

        assert!(result.samples.iter().all(|s| !s.has_incident));
        let orphan_times: Vec<_> = result
            .orphans
            .iter()
            .map(|o| o.group.representative_time)
            .collect();
        assert_eq!(orphan_times, vec![at(9, 55, 0), at(10, 5, 0)]);
    }

    #[test]
    fn test_group_beaten_by_nearer_one_becomes_orphan() {
        // Both within window of the only sample; only the nearest is matched
        let samples = vec![sample(at(10, 0, 0))];
        let groups = vec![incident(1, at(10, 0, 2)), incident(2, at(10, 0, 20))];

        let result = Correlator::new(60.0).annotate(&samples, &groups);
        assert_eq!(result.samples[0].incident_time, Some(at(10, 0, 2)));
        assert_eq!(result.orphans.len(), 1);
        assert_eq!(result.orphans[0].group.representative_time, at(10, 0, 20));
    }

    #[test]
    fn test_samples_emitted_ascending() {
        let samples = vec![
            sample(at(10, 0, 4)),
            sample(at(10, 0, 2)),
            sample(at(10, 0, 0)),
        ];

        let result = Correlator::default().annotate(&samples, &[]);
        let times: Vec<_> = result.samples.iter().map(|s| s.sample.occurred_at).collect();
        assert_eq!(times, vec![at(10, 0, 0), at(10, 0, 2), at(10, 0, 4)]);
    }

    #[test]
    fn test_idempotent() {
        let samples = vec![sample(at(10, 0, 0)), sample(at(10, 0, 30))];
        let groups = vec![incident(1, at(10, 0, 10)), incident(2, at(10, 3, 0))];
        let correlator = Correlator::new(15.0);

        assert_eq!(
            correlator.annotate(&samples, &groups),
            correlator.annotate(&samples, &groups)
        );
    }

    #[test]
    fn test_nearest_group_handles_duplicate_times() {
        let t = at(10, 0, 0);
        let times = vec![t, t, t + Duration::seconds(10)];

        assert_eq!(nearest_group(&times, t + Duration::seconds(3)), Some((0, 3.0)));
        assert_eq!(nearest_group(&times, t + Duration::seconds(5)), Some((0, 5.0)));
        assert_eq!(nearest_group(&times, t + Duration::seconds(7)), Some((2, 3.0)));
        assert_eq!(nearest_group(&times, t - Duration::seconds(1)), Some((0, 1.0)));
        assert_eq!(nearest_group(&[], t), None);
    }
}
