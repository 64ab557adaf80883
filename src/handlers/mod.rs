pub mod dashboard_api;
pub mod health;
pub mod metrics_handler;

pub use dashboard_api::{create_dashboard_router, DashboardState};
