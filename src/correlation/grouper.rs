//! Incident grouper
//!
//! Errors are sorted by time and chained into a group while each error is at
//! most `gap_threshold_seconds` after the previous member. The threshold is
//! measured against the most recent member, not the first one, so a slow
//! drip of errors forms a single long incident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::seconds_between;
use crate::models::ErrorEvent;

/// A run of errors close enough in time to count as one incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "IncidentGroupWire", try_from = "IncidentGroupWire")]
pub struct IncidentGroup {
    /// Time of the first member
    pub representative_time: DateTime<Utc>,
    pub count: usize,
    /// Members in ascending time order
    pub members: Vec<ErrorEvent>,
}

impl IncidentGroup {
    fn from_members(members: Vec<ErrorEvent>) -> Option<Self> {
        let representative_time = members.first()?.occurred_at;
        Some(Self {
            representative_time,
            count: members.len(),
            members,
        })
    }

    /// `HH:MM:SS` label of the representative time (UTC)
    pub fn label(&self) -> String {
        self.representative_time.format("%H:%M:%S").to_string()
    }

    /// Message of the first member, if it carried one
    pub fn first_message(&self) -> Option<&str> {
        self.members.first().and_then(|m| m.message.as_deref())
    }
}

/// Wire shape shared by the HTTP API and the terminal dashboard
#[derive(Serialize, Deserialize)]
struct IncidentGroupWire {
    #[serde(default)]
    time: String,
    timestamp: DateTime<Utc>,
    count: usize,
    errors: Vec<ErrorEvent>,
}

impl From<IncidentGroup> for IncidentGroupWire {
    fn from(group: IncidentGroup) -> Self {
        Self {
            time: group.label(),
            timestamp: group.representative_time,
            count: group.count,
            errors: group.members,
        }
    }
}

impl TryFrom<IncidentGroupWire> for IncidentGroup {
    type Error = String;

    fn try_from(wire: IncidentGroupWire) -> Result<Self, Self::Error> {
        let mut members = wire.errors;
        members.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
        Self::from_members(members).ok_or_else(|| "incident group without members".to_string())
    }
}

/// Group error events into incidents
///
/// Input order does not matter: events are sorted by `occurred_at`, ties
/// broken by `id`. Equal timestamps always chain (delta 0). The trailing
/// group is always emitted. Empty input yields an empty list.
pub fn group(events: &[ErrorEvent], gap_threshold_seconds: f64) -> Vec<IncidentGroup> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));

    let mut sorted = sorted.into_iter();
    let Some(first) = sorted.next() else {
        return Vec::new();
    };

    let mut groups = Vec::new();
    let mut last_time = first.occurred_at;
    let mut current = vec![first];

    for event in sorted {
        let delta = seconds_between(last_time, event.occurred_at);
        last_time = event.occurred_at;

        if delta <= gap_threshold_seconds {
            current.push(event);
        } else {
            groups.extend(IncidentGroup::from_members(std::mem::take(&mut current)));
            current.push(event);
        }
    }

    groups.extend(IncidentGroup::from_members(current));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, h, m, s).unwrap()
    }

    fn event(id: i64, time: DateTime<Utc>) -> ErrorEvent {
        ErrorEvent::new(id, time, Some(format!("error {}", id)))
    }

    #[test]
    fn test_empty_input() {
        assert!(group(&[], 5.0).is_empty());
    }

    #[test]
    fn test_single_event() {
        let groups = group(&[event(1, at(10, 0, 0))], 5.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 1);
        assert_eq!(groups[0].representative_time, at(10, 0, 0));
    }

    #[test]
    fn test_worked_example() {
        // 03 chains to 00 (3s), 10 is 7s after 03
        let events = vec![
            event(1, at(10, 0, 0)),
            event(2, at(10, 0, 3)),
            event(3, at(10, 0, 10)),
        ];

        let groups = group(&events, 5.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].representative_time, at(10, 0, 0));
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].representative_time, at(10, 0, 10));
        assert_eq!(groups[1].count, 1);
    }

    #[test]
    fn test_chaining_measures_against_last_member() {
        // 0, 4, 8, ..., 40: every step is within 5s, first-to-last is 40s
        let start = at(10, 0, 0);
        let events: Vec<ErrorEvent> = (0..=10)
            .map(|i| event(i, start + Duration::seconds(4 * i)))
            .collect();

        let groups = group(&events, 5.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 11);
        assert_eq!(groups[0].members.last().unwrap().occurred_at, at(10, 0, 40));
    }

    #[test]
    fn test_gap_just_over_threshold_splits() {
        let start = at(10, 0, 0);
        let events = vec![
            event(1, start),
            event(2, start + Duration::milliseconds(5001)),
        ];

        let groups = group(&events, 5.0);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.count == 1));
    }

    #[test]
    fn test_gap_exactly_threshold_chains() {
        let events = vec![event(1, at(10, 0, 0)), event(2, at(10, 0, 5))];
        assert_eq!(group(&events, 5.0).len(), 1);
    }

    #[test]
    fn test_equal_timestamps_chain_with_zero_threshold() {
        let events = vec![
            event(2, at(10, 0, 0)),
            event(1, at(10, 0, 0)),
            event(3, at(10, 0, 1)),
        ];

        let groups = group(&events, 0.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].members[0].id, 1);
        assert_eq!(groups[0].members[1].id, 2);
    }

    #[test]
    fn test_order_independent() {
        let events = vec![
            event(1, at(10, 0, 0)),
            event(2, at(10, 0, 0)),
            event(3, at(10, 0, 3)),
            event(4, at(10, 0, 10)),
            event(5, at(10, 1, 0)),
        ];
        let expected = group(&events, 5.0);

        let mut reversed = events.clone();
        reversed.reverse();
        assert_eq!(group(&reversed, 5.0), expected);

        let rotated: Vec<ErrorEvent> = events[2..].iter().chain(&events[..2]).cloned().collect();
        assert_eq!(group(&rotated, 5.0), expected);
    }

    #[test]
    fn test_members_sorted_and_representative_is_first() {
        let events = vec![
            event(3, at(10, 0, 4)),
            event(1, at(10, 0, 0)),
            event(2, at(10, 0, 2)),
        ];

        let groups = group(&events, 5.0);
        let times: Vec<_> = groups[0].members.iter().map(|m| m.occurred_at).collect();
        assert_eq!(times, vec![at(10, 0, 0), at(10, 0, 2), at(10, 0, 4)]);
        assert_eq!(groups[0].representative_time, groups[0].members[0].occurred_at);
        assert_eq!(groups[0].first_message(), Some("error 1"));
    }

    #[test]
    fn test_serialized_shape() {
        let groups = group(&[event(1, at(9, 5, 7))], 5.0);
        let json = serde_json::to_value(&groups[0]).unwrap();

        assert_eq!(json["time"], "09:05:07");
        assert_eq!(json["timestamp"], "2025-01-10T09:05:07Z");
        assert_eq!(json["count"], 1);
        assert_eq!(json["errors"][0]["id"], 1);

        let back: IncidentGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, groups[0]);
    }

    #[test]
    fn test_deserialize_rejects_empty_group() {
        let json = serde_json::json!({
            "time": "10:00:00",
            "timestamp": "2025-01-10T10:00:00Z",
            "count": 0,
            "errors": []
        });
        assert!(serde_json::from_value::<IncidentGroup>(json).is_err());
    }
}
