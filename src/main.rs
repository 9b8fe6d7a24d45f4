//! Chanspan - channel activity span
//!
//! Command line entry point.

mod commands;

use chanspan::{config::Config, error};
use clap::Command;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    error::install_error_handlers()?;

    // Load configuration from file and/or environment variables
    let config = Config::load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load configuration: {}", e))?;
    config.validate().map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {}", e))?;

    init_logging(&config);

    let base_app = Command::new("chanspan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Channel activity span calculator")
        .subcommand_required(true)
        .arg_required_else_help(true);

    let app = commands::register_commands(base_app);
    let matches = app.get_matches();

    commands::handle_commands(matches, &config).await?;

    info!("Execution completed successfully");
    Ok(())
}

fn init_logging(config: &Config) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.default_level));

    if let Some(dep_filter) = &config.logging.dependency_filter {
        let filter_string = format!("{},{}", env_filter, dep_filter);
        env_filter = EnvFilter::try_new(&filter_string).unwrap_or(env_filter);
    }

    // Logs go to stderr so command output stays machine readable
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.format == "json" {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        let format = fmt::format().with_thread_ids(true).with_target(false);
        registry.with(fmt::layer().event_format(format).with_writer(std::io::stderr)).init();
    }
}
