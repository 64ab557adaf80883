use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::correlation::{
    Correlator, DEFAULT_GAP_THRESHOLD_SECONDS, DEFAULT_MATCH_WINDOW_SECONDS,
    DEFAULT_ORPHAN_TOLERANCE_SECONDS,
};

/// Environment variable holding the database connection string
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Telemetry database settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// `postgres://`, `postgresql://` or `sqlite:` URL. Falls back to `DATABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,

    /// Postgres schema holding the tables (ignored for SQLite)
    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_metrics_table")]
    pub metrics_table: String,

    /// Table of test requests, with an `error` flag per row
    #[serde(default = "default_results_table")]
    pub results_table: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_idle_timeout_seconds")]
    pub idle_timeout_seconds: u64,

    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            schema: default_schema(),
            metrics_table: default_metrics_table(),
            results_table: default_results_table(),
            max_connections: default_max_connections(),
            idle_timeout_seconds: default_idle_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, or `DATABASE_URL` from the environment
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .filter(|u| !u.is_empty())
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok().filter(|u| !u.is_empty()))
    }
}

/// Incident grouping and correlation parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CorrelationConfig {
    #[serde(default = "default_gap_threshold_seconds")]
    pub gap_threshold_seconds: f64,

    #[serde(default = "default_match_window_seconds")]
    pub match_window_seconds: f64,

    #[serde(default = "default_orphan_tolerance_seconds")]
    pub orphan_tolerance_seconds: f64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            gap_threshold_seconds: default_gap_threshold_seconds(),
            match_window_seconds: default_match_window_seconds(),
            orphan_tolerance_seconds: default_orphan_tolerance_seconds(),
        }
    }
}

impl CorrelationConfig {
    pub fn correlator(&self) -> Correlator {
        Correlator::new(self.match_window_seconds)
            .with_orphan_tolerance(self.orphan_tolerance_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Metric rows per snapshot (default: 100)
    #[serde(default = "default_metrics_limit")]
    pub metrics_limit: i64,

    /// Error rows fetched for grouping (default: 1000)
    #[serde(default = "default_errors_limit")]
    pub errors_limit: i64,

    /// Completed-request rows fetched for the history chart (default: 10000)
    #[serde(default = "default_requests_limit")]
    pub requests_limit: i64,

    /// Bucket width of the request history chart (default: 60)
    #[serde(default = "default_request_interval_seconds")]
    pub request_interval_seconds: u64,

    /// Terminal dashboard refresh period (default: 2.0)
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            metrics_limit: default_metrics_limit(),
            errors_limit: default_errors_limit(),
            requests_limit: default_requests_limit(),
            request_interval_seconds: default_request_interval_seconds(),
            refresh_interval_seconds: default_refresh_interval_seconds(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_schema() -> String {
    "busca_fornecedor".to_string()
}

fn default_metrics_table() -> String {
    "LLM-Metrics".to_string()
}

fn default_results_table() -> String {
    "result_vllm_test".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_idle_timeout_seconds() -> u64 {
    30
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_gap_threshold_seconds() -> f64 {
    DEFAULT_GAP_THRESHOLD_SECONDS
}

fn default_match_window_seconds() -> f64 {
    DEFAULT_MATCH_WINDOW_SECONDS
}

fn default_orphan_tolerance_seconds() -> f64 {
    DEFAULT_ORPHAN_TOLERANCE_SECONDS
}

fn default_metrics_limit() -> i64 {
    100
}

fn default_errors_limit() -> i64 {
    1000
}

fn default_requests_limit() -> i64 {
    10_000
}

fn default_request_interval_seconds() -> u64 {
    60
}

fn default_refresh_interval_seconds() -> f64 {
    2.0
}

/// Load configuration from a TOML file plus `GPU_DASHBOARD__*` overrides
///
/// A missing file is not an error: every field has a default and the
/// database URL may come from `DATABASE_URL`.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("GPU_DASHBOARD").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!(
            "Invalid log_format '{}': must be 'text' or 'json'",
            cfg.server.log_format
        );
    }

    if let Some(url) = cfg.database.resolved_url() {
        if !is_supported_url(&url) {
            anyhow::bail!(
                "Database URL must start with postgresql://, postgres:// or sqlite:"
            );
        }
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be at least 1");
    }

    let c = &cfg.correlation;
    for (name, value) in [
        ("gap_threshold_seconds", c.gap_threshold_seconds),
        ("match_window_seconds", c.match_window_seconds),
        ("orphan_tolerance_seconds", c.orphan_tolerance_seconds),
    ] {
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("correlation.{} must be a non-negative number, got {}", name, value);
        }
    }

    let d = &cfg.dashboard;
    if d.metrics_limit <= 0 || d.errors_limit <= 0 || d.requests_limit <= 0 {
        anyhow::bail!("dashboard limits must be positive");
    }
    if d.request_interval_seconds == 0 {
        anyhow::bail!("dashboard.request_interval_seconds must be at least 1");
    }
    if !(0.1..=60.0).contains(&d.refresh_interval_seconds) {
        anyhow::bail!(
            "dashboard.refresh_interval_seconds must be between 0.1 and 60, got {}",
            d.refresh_interval_seconds
        );
    }

    Ok(())
}

pub fn is_supported_url(url: &str) -> bool {
    url.starts_with("postgresql://") || url.starts_with("postgres://") || url.starts_with("sqlite:")
}
