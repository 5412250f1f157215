use clap::Parser;
use eyre::{Context, Result};
use log::info;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

mod cli;
mod config;
mod error;
mod event;
mod handler;
mod payload;
mod template;

use cli::Cli;
use config::{Config, LogLevel};
use event::Event;

fn setup_logging(log_level: LogLevel) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        // Let env_logger parse RUST_LOG
        builder.parse_default_env();
    } else {
        builder.filter_level(log_level.as_filter());
    }

    // Sensu captures handler stderr into the backend log
    builder.target(env_logger::Target::Stderr).init();
}

fn read_event(event_file: Option<&Path>) -> Result<Event> {
    let event = match event_file {
        Some(path) => {
            let path = Config::expand_path(path);
            let file = File::open(&path).context(format!("Failed to open event file {}", path.display()))?;
            Event::from_reader(BufReader::new(file))?
        }
        None => Event::from_reader(io::stdin().lock()).context("Failed to read event from stdin")?,
    };
    Ok(event)
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let event = read_event(cli.event_file.as_deref())?;
    info!(
        "Handling event for {}/{} (status {})",
        event.entity.name(),
        event.check.name(),
        event.check.status
    );

    if cli.dry_run {
        let payload = handler::prepare(&event, &config)?;
        let json = serde_json::to_string_pretty(&payload).context("Failed to serialize payload")?;
        println!("{}", json);
        return Ok(());
    }

    handler::handle(&event, &config)?;
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments first
    let cli = Cli::parse();

    // Flags and their env vars take precedence over the config file
    let config = Config::load(cli.config.as_ref())
        .context("Failed to load configuration")?
        .apply_args(&cli);

    setup_logging(config.log_level);
    info!("Starting sensu-squadcast-handler with {:?}", config);

    run(cli, config).context("Error executing sensu-squadcast-handler")?;

    Ok(())
}
