//! Telemetry records as read from the database.
//!
//! These types are produced by a [`crate::telemetry::TelemetrySource`] and are
//! read-only to the correlation core.

pub mod event;
pub mod metric;

pub use event::ErrorEvent;
pub use metric::{MetricField, MetricSample};
