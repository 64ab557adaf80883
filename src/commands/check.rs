use anyhow::Result;
use colored::Colorize;
use gpu_metrics_dashboard::{
    config,
    telemetry::{self, url_preview},
};
use std::path::Path;
use tracing::info;

/// Execute the check command
///
/// Connects to the telemetry database and runs one query against each table.
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Checking telemetry database...".yellow());

    let cfg = config::load_config(config_path)?;

    let Some(url) = cfg.database.resolved_url() else {
        println!("{}", "✗ No database URL configured".red());
        println!("  Set {} or database.url in the config file", config::DATABASE_URL_ENV);
        anyhow::bail!("database URL is not set");
    };

    println!("  {}: {}", "URL".cyan(), url_preview(&url));
    println!("  {}: {} characters", "Length".cyan(), url.len());

    let source = telemetry::connect(&cfg.database).await?;
    println!("  {}: {}", "Backend".cyan(), source.backend());

    let now = source.ping().await?;
    println!("{} (database time {})", "✓ Connection successful".green(), now);

    match source.fetch_latest_metric().await {
        Ok(Some(sample)) => println!(
            "{} latest sample at {}",
            "✓ Metrics table readable:".green(),
            sample.occurred_at.format("%Y-%m-%d %H:%M:%S")
        ),
        Ok(None) => println!("{}", "✓ Metrics table readable (empty)".green()),
        Err(e) => println!("{} {} [{}]", "✗ Metrics table:".red(), e, e.code()),
    }

    match source.count_completed_requests().await {
        Ok(count) => println!(
            "{} {} completed requests",
            "✓ Results table readable:".green(),
            count
        ),
        Err(e) => println!("{} {} [{}]", "✗ Results table:".red(), e, e.code()),
    }

    info!(backend = source.backend(), "Database check finished");
    Ok(())
}
