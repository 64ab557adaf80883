//! Terminal dashboard
//!
//! Polls a running server's `/api/metrics` endpoint and renders the cards
//! and incident-annotated charts with ratatui.

pub mod fetcher;
pub mod ui;

pub use fetcher::SnapshotFetcher;
pub use ui::WatchApp;
