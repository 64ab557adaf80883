use anyhow::Result;
use colored::Colorize;
use gpu_metrics_dashboard::{
    config,
    correlation::{group, IncidentGroup},
    telemetry,
};
use std::path::Path;
use tracing::info;

/// Execute the incidents command
///
/// Fetches recent errors, groups them and prints one line per incident.
pub async fn execute(
    config_path: &Path,
    limit: Option<i64>,
    gap: Option<f64>,
    json: bool,
) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let limit = limit.unwrap_or(cfg.dashboard.errors_limit);
    let gap = gap.unwrap_or(cfg.correlation.gap_threshold_seconds);

    if limit <= 0 {
        anyhow::bail!("--limit must be positive");
    }
    if !gap.is_finite() || gap < 0.0 {
        anyhow::bail!("--gap must be a non-negative number of seconds");
    }

    let source = telemetry::connect(&cfg.database).await?;
    let errors = source.fetch_errors(limit).await?;
    let groups = group(&errors, gap);

    info!(errors = errors.len(), groups = groups.len(), gap, "Errors grouped");

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{} errors in {} incidents (gap threshold {}s)",
            errors.len(),
            groups.len(),
            gap
        )
        .bold()
    );
    println!();

    for (idx, incident) in groups.iter().enumerate() {
        println!("{}", format_incident(idx + 1, incident));
    }

    Ok(())
}

fn format_incident(number: usize, incident: &IncidentGroup) -> String {
    let count = if incident.count > 1 {
        format!("{} errors", incident.count).red().bold()
    } else {
        "1 error".yellow()
    };

    let span = match (incident.members.first(), incident.members.last()) {
        (Some(first), Some(last)) if incident.count > 1 => format!(
            " over {}s",
            (last.occurred_at - first.occurred_at).num_seconds()
        ),
        _ => String::new(),
    };

    format!(
        "  {:>3}. {} {}{}  {}",
        number,
        incident.representative_time.format("%Y-%m-%d %H:%M:%S").to_string().cyan(),
        count,
        span,
        incident.first_message().unwrap_or("(no message)").dimmed()
    )
}
