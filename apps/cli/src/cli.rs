//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "esp32", version, about = "Talk to an ESP32 board over the local network")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Board host name or address.
    #[arg(long, global = true, env = "ESP32_HOST")]
    pub host: Option<String>,

    /// Pin-control TCP port.
    #[arg(long, global = true, env = "ESP32_PORT")]
    pub port: Option<u16>,

    /// Connect timeout in milliseconds.
    #[arg(long, global = true, env = "ESP32_TIMEOUT_MS")]
    pub timeout: Option<u64>,

    /// Bearer token for `run`.
    #[arg(long, global = true, env = "ESP32_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Also pass the token as a `?token=` query parameter.
    #[arg(long, global = true)]
    pub token_query: bool,

    /// Total connection attempts.
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Delay between connection attempts in milliseconds.
    #[arg(long, global = true)]
    pub retry_delay: Option<u64>,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve and connect, then send a sampling-interval probe.
    Discover,
    /// Blink the built-in LED for ten seconds.
    Blink,
    /// Drive the built-in LED: on, off or toggle.
    Led {
        #[arg(default_value = "toggle")]
        action: String,
    },
    /// Query the HTTP health endpoint.
    Health,
    /// POST a JSON job to the HTTP run endpoint.
    Run {
        /// Inline JSON, or a path to a JSON file.
        payload: String,
    },
}
