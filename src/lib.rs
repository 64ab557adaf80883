pub mod config;
pub mod correlation;
pub mod dashboard;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod server;
pub mod signals;
pub mod telemetry;
pub mod tui;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` overrides `level`. `format` is "text" or "json". Output goes
/// to stderr so the terminal dashboard and command output stay clean.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
