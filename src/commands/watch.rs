//! Watch command implementation
//!
//! Real-time terminal dashboard fed by a running server's `/api/metrics`.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::FutureExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::Path, time::Duration};
use tokio::time::interval;

use gpu_metrics_dashboard::{
    config,
    correlation::Correlator,
    tui::{fetcher::snapshot_url, SnapshotFetcher, WatchApp},
};

/// Execute the watch command
///
/// # Arguments
/// * `interval_secs` - Refresh interval; defaults to `dashboard.refresh_interval_seconds`
/// * `url` - Snapshot endpoint; derived from the server address if None
pub async fn execute(
    config_path: &Path,
    interval_secs: Option<f64>,
    url: Option<String>,
) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let interval_secs = interval_secs.unwrap_or(cfg.dashboard.refresh_interval_seconds);
    validate_interval(interval_secs)?;

    let url = url.unwrap_or_else(|| snapshot_url(&cfg.server.host, cfg.server.port));

    run_dashboard(url, interval_secs, cfg.correlation.correlator()).await
}

fn validate_interval(interval: f64) -> Result<()> {
    if !(0.1..=60.0).contains(&interval) {
        anyhow::bail!(
            "Invalid interval: {}. Must be between 0.1 and 60 seconds",
            interval
        );
    }
    Ok(())
}

async fn run_dashboard(url: String, interval_secs: f64, correlator: Correlator) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = WatchApp::new(url.clone(), correlator);
    let fetcher = SnapshotFetcher::new(url);
    let mut interval_timer = interval(Duration::from_secs_f64(interval_secs));

    fetch_and_update(&mut app, &fetcher).await;

    let result = loop {
        if let Err(e) = terminal.draw(|f| app.render(f)) {
            break Err(e.into());
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key) {
                    break Ok(());
                }

                match key.code {
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        fetch_and_update(&mut app, &fetcher).await;
                    }
                    // Chart page changed: avoid leftover braille cells
                    KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
                        terminal.clear()?;
                    }
                    _ => {}
                }
            }
        }

        if interval_timer.tick().now_or_never().is_some() {
            fetch_and_update(&mut app, &fetcher).await;
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Fetch a snapshot; on failure keep the previous data and show the error
async fn fetch_and_update(app: &mut WatchApp, fetcher: &SnapshotFetcher) {
    match fetcher.fetch().await {
        Ok(snapshot) => app.apply_snapshot(snapshot),
        Err(e) => {
            tracing::debug!(url = fetcher.url(), error = %e, "Snapshot fetch failed");
            app.error_message = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_interval() {
        assert!(validate_interval(2.0).is_ok());
        assert!(validate_interval(0.1).is_ok());
        assert!(validate_interval(0.05).is_err());
        assert!(validate_interval(61.0).is_err());
    }
}
