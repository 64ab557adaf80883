use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gpu-dashboard", version, about = "GPU / vLLM telemetry dashboard")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the dashboard HTTP server (default)
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Display the real-time terminal dashboard
    Watch {
        /// Refresh interval in seconds (default: dashboard.refresh_interval_seconds)
        #[arg(short, long)]
        interval: Option<f64>,

        /// Snapshot endpoint URL (derived from the server address if not provided)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Print grouped error incidents
    Incidents {
        /// Number of recent errors to fetch
        #[arg(short, long)]
        limit: Option<i64>,

        /// Gap threshold in seconds
        #[arg(short, long)]
        gap: Option<f64>,

        /// Print the groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Test the database connection and tables
    Check,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration (with the database password masked)
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Serve if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve { port: None })
    }
}
