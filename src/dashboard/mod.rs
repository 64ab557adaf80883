//! Dashboard view model
//!
//! Everything the renderers (HTTP API and terminal UI) need, computed from a
//! single [`DashboardSnapshot`]:
//! - `cards`: latest values with warning/critical status
//! - `charts`: one chart model per series, parameterised by [`Aggregation`]
//! - `series`: raw / cumulative / per-interval aggregation
//! - `snapshot`: fetching and assembling the data from a telemetry source

pub mod cards;
pub mod charts;
pub mod series;
pub mod snapshot;

pub use cards::{CardStatus, DashboardCards, MetricCard};
pub use charts::{build_chart, default_charts, ChartPoint, ChartSource, ChartSpec, ChartView};
pub use series::{Aggregation, RequestHistoryPoint, SeriesPoint};
pub use snapshot::{DashboardSnapshot, ErrorReport, LatestSnapshot};
