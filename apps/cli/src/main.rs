//! `esp32` entry point.

mod cli;
mod commands;
mod config;
mod firmata;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let file = config::FileConfig::load(cli.config.as_deref())?;
    let settings = config::Settings::merge(&cli, file);
    tracing::debug!(host = %settings.host, port = settings.port, "settings resolved");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(commands::run(cli.command, settings))
}
