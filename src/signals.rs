use anyhow::Result;
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::config::Config;

/// Shutdown signal types
#[derive(Debug, Clone, Copy)]
pub enum ShutdownSignal {
    /// Graceful shutdown (drain connections, clean up)
    Graceful,
}

/// Setup signal handlers for the server
///
/// Returns a broadcast sender for shutdown signals and a join handle for the signal task
///
/// Handles:
/// - SIGTERM/SIGINT: Graceful shutdown
/// - SIGHUP: Configuration reload from `config_path`
#[cfg(unix)]
pub fn setup_signal_handlers(
    config: Arc<ArcSwap<Config>>,
    config_path: PathBuf,
) -> Result<(broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    if let Err(e) = reload_config(&config, &config_path) {
                        error!("Failed to reload configuration: {:#}", e);
                    } else {
                        info!("Configuration reloaded successfully");
                    }
                }
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Windows: only Ctrl+C is supported, no reload
#[cfg(not(unix))]
pub fn setup_signal_handlers(
    _config: Arc<ArcSwap<Config>>,
    _config_path: PathBuf,
) -> Result<(broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, initiating shutdown");
                let _ = tx_clone.send(ShutdownSignal::Graceful);
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Load, validate and swap in a new configuration
///
/// Correlation and dashboard settings apply to the next request. The
/// telemetry pool is built once at startup, so database changes only log a
/// warning. On any error the old configuration stays in place.
pub fn reload_config(config: &ArcSwap<Config>, config_path: &std::path::Path) -> Result<()> {
    let new_config = crate::config::load_config(config_path)?;
    let old_config = config.load();

    if new_config.database.resolved_url() != old_config.database.resolved_url()
        || new_config.database.schema != old_config.database.schema
        || new_config.database.metrics_table != old_config.database.metrics_table
        || new_config.database.results_table != old_config.database.results_table
    {
        warn!("Database settings changed; restart the server to apply them");
    }

    info!(
        gap_threshold_seconds = new_config.correlation.gap_threshold_seconds,
        match_window_seconds = new_config.correlation.match_window_seconds,
        metrics_limit = new_config.dashboard.metrics_limit,
        "New configuration loaded"
    );

    config.store(Arc::new(new_config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_setup_signal_handlers() {
        let config = Arc::new(ArcSwap::from_pointee(Config::default()));
        let (shutdown_tx, _handle) =
            setup_signal_handlers(config, PathBuf::from("config.toml")).unwrap();

        let mut rx = shutdown_tx.subscribe();
        shutdown_tx.send(ShutdownSignal::Graceful).unwrap();

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, ShutdownSignal::Graceful));
    }

    #[test]
    fn test_reload_swaps_config() {
        let config = ArcSwap::from_pointee(Config::default());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[correlation]\ngap_threshold_seconds = 12").unwrap();

        reload_config(&config, file.path()).unwrap();
        assert_eq!(config.load().correlation.gap_threshold_seconds, 12.0);
    }

    #[test]
    fn test_reload_keeps_old_config_on_error() {
        let config = ArcSwap::from_pointee(Config::default());

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[correlation]\nmatch_window_seconds = -3").unwrap();

        assert!(reload_config(&config, file.path()).is_err());
        assert_eq!(config.load().correlation.match_window_seconds, 60.0);
    }
}
