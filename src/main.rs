use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use gpu_metrics_dashboard::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    // Logging settings come from the config file; a broken file is reported
    // by the command itself.
    let server = config::load_config(&args.config)
        .map(|cfg| cfg.server)
        .unwrap_or_default();

    // The terminal dashboard owns the screen: only errors get through
    let level = match command {
        cli::Commands::Watch { .. } => "error",
        _ => server.log_level.as_str(),
    };
    init_tracing(level, &server.log_format);

    match command {
        cli::Commands::Serve { port } => {
            commands::serve::execute(&args.config, port).await?;
        }
        cli::Commands::Watch { interval, url } => {
            commands::watch::execute(&args.config, interval, url).await?;
        }
        cli::Commands::Incidents { limit, gap, json } => {
            commands::incidents::execute(&args.config, limit, gap, json).await?;
        }
        cli::Commands::Check => {
            commands::check::execute(&args.config).await?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Version => {
            println!("GPU Metrics Dashboard v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
