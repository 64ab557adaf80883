use anyhow::Result;
use colored::Colorize;
use gpu_metrics_dashboard::{config, server};
use std::path::Path;
use tracing::info;

/// Execute the serve command
pub async fn execute(config_path: &Path, port: Option<u16>) -> Result<()> {
    println!("{}", "Starting GPU metrics dashboard...".green());

    let mut cfg = config::load_config(config_path)?;
    if let Some(port) = port {
        cfg.server.port = port;
    }

    info!(
        config = %config_path.display(),
        database_configured = cfg.database.resolved_url().is_some(),
        "Configuration loaded"
    );

    server::start_server(cfg, config_path.to_path_buf()).await
}
