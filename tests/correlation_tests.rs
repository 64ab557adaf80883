//! Grouping and correlation behaviour over realistic incident timelines

use chrono::{DateTime, Duration, TimeZone, Utc};

use gpu_metrics_dashboard::correlation::{group, Correlator};
use gpu_metrics_dashboard::models::{ErrorEvent, MetricField, MetricSample};

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap() + Duration::seconds(seconds)
}

fn errors_at(times: &[i64]) -> Vec<ErrorEvent> {
    times
        .iter()
        .enumerate()
        .map(|(i, &t)| ErrorEvent::new(i as i64 + 1, at(t), Some(format!("error {}", i + 1))))
        .collect()
}

/// Samples every `step` seconds over [from, to]
fn samples(from: i64, to: i64, step: usize) -> Vec<MetricSample> {
    (from..=to)
        .step_by(step)
        .map(|t| MetricSample::new(at(t)).with_value(MetricField::GpuUtilPercent, 50.0))
        .collect()
}

#[test]
fn test_group_partitions_every_error_once() {
    let events = errors_at(&[0, 3, 9, 14, 15, 40, 41, 100]);
    let groups = group(&events, 5.0);

    let total: usize = groups.iter().map(|g| g.count).sum();
    assert_eq!(total, events.len());

    let sizes: Vec<usize> = groups.iter().map(|g| g.count).collect();
    assert_eq!(sizes, vec![2, 3, 2, 1]);

    // Groups are ascending and separated by more than the gap
    for pair in groups.windows(2) {
        let last_of_prev = pair[0].members.last().unwrap().occurred_at;
        assert!(pair[1].representative_time - last_of_prev > Duration::seconds(5));
    }
}

#[test]
fn test_larger_gap_never_increases_group_count() {
    let events = errors_at(&[0, 2, 7, 13, 20, 28, 37, 47, 58]);

    let mut previous = usize::MAX;
    for gap in [0.0, 2.0, 5.0, 6.0, 8.0, 10.0, 60.0] {
        let count = group(&events, gap).len();
        assert!(count <= previous, "gap {} produced {} groups", gap, count);
        previous = count;
    }
    assert_eq!(group(&events, 60.0).len(), 1);
}

#[test]
fn test_burst_during_sampling_is_marked_not_orphaned() {
    let events = errors_at(&[120, 121, 122]);
    let groups = group(&events, 5.0);
    let correlation = Correlator::default().annotate(&samples(0, 600, 30), &groups);

    assert!(correlation.orphans.is_empty());
    let marked: Vec<_> = correlation.samples.iter().filter(|s| s.has_incident).collect();
    // Samples within 60 s of 09:02:00
    assert_eq!(marked.len(), 5);
    assert!(marked.iter().all(|s| s.incident_count == 3));
    assert!(marked
        .iter()
        .all(|s| s.incident_sample_message.as_deref() == Some("error 1")));
}

#[test]
fn test_incident_in_sampling_gap_becomes_orphan() {
    // Sampling stalled between 100 s and 400 s
    let mut timeline = samples(0, 100, 10);
    timeline.extend(samples(400, 500, 10));

    let groups = group(&errors_at(&[250]), 5.0);
    let correlation = Correlator::default().annotate(&timeline, &groups);

    assert!(correlation.samples.iter().all(|s| !s.has_incident));
    assert_eq!(correlation.orphans.len(), 1);
    assert_eq!(correlation.orphans[0].group.representative_time, at(250));
}

#[test]
fn test_custom_window_and_tolerance() {
    let groups = group(&errors_at(&[130]), 5.0);
    let timeline = samples(0, 100, 10);

    // Default window: 30 s from the last sample, marked
    let correlation = Correlator::default().annotate(&timeline, &groups);
    assert!(correlation.samples.last().unwrap().has_incident);

    // Narrow window and tolerance: neither marked nor orphaned
    let correlation = Correlator::new(10.0)
        .with_orphan_tolerance(20.0)
        .annotate(&timeline, &groups);
    assert!(correlation.samples.iter().all(|s| !s.has_incident));
    assert!(correlation.orphans.is_empty());
}
